//! Identification example
//!
//! Repeatedly captures a finger and looks it up in the sensor library.

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

    println!(
        "Sensor ready: {} templates stored",
        sensor.template_count()?
    );

    for _ in 0..5 {
        match sensor.search_fingerprint(&ConsolePrompts)? {
            Some(result) => println!("Recognized: {}", result),
            None => println!("Unknown finger"),
        }
    }

    sensor.close();
    Ok(())
}
