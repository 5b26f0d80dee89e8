//! Interactive enrollment example
//!
//! Enrolls a finger into the first free library slot.

use fpm10::{HumanActionListener, Sensor};

struct ConsolePrompts;

impl HumanActionListener for ConsolePrompts {
    fn put_finger(&self) {
        println!(">> Put your finger on the sensor");
    }

    fn remove_finger(&self) {
        println!(">> Remove your finger from the sensor");
    }
}

fn main() -> fpm10::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let port = std::env::var("SENSOR_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    let sensor = Sensor::new(port);
    sensor.open()?;

    let used = sensor.template_count()?;
    println!(
        "Sensor ready: {} of {} slots used",
        used,
        sensor.library_capacity()?
    );

    println!("Enrolling into slot {}...", used);
    sensor.enroll(used, &ConsolePrompts)?;

    println!("Done! {} templates stored", sensor.template_count()?);

    sensor.close();
    Ok(())
}
