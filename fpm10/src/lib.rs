//! # fpm10
//!
//! Host-side driver for FPM10-family optical fingerprint sensors attached
//! over a serial link.
//!
//! ## Features
//!
//! - Full workflow catalogue: enroll, search, match, image and template
//!   transfer in both directions
//! - Blocking API under one session mutex, with asynchronous counterparts
//!   returning cancellable [`Activity`] handles
//! - Framed, checksummed wire protocol with a buffered, baud-paced reader
//!
//! ## Quick start
//!
//! ```no_run
//! use fpm10::{CharBuffer, Sensor};
//!
//! fn main() -> fpm10::Result<()> {
//!     let sensor = Sensor::new("/dev/ttyUSB0");
//!     sensor.open()?;
//!
//!     println!(
//!         "{} of {} library slots used",
//!         sensor.template_count()?,
//!         sensor.library_capacity()?
//!     );
//!
//!     if sensor.get_image()? {
//!         sensor.extract_features(CharBuffer::One)?;
//!         match sensor.search()? {
//!             Some(result) => println!("Recognized: {}", result),
//!             None => println!("Unknown finger"),
//!         }
//!     }
//!
//!     sensor.close();
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod error;
pub mod listener;
pub mod sensor;
pub mod utils;

// Re-exports
pub use activity::Activity;
pub use error::{Error, Result};
pub use listener::HumanActionListener;
pub use sensor::Sensor;

// Re-export types
pub use fpm10_core::{CharBuffer, ConfirmationCode};
pub use fpm10_transport::{SerialLink, UartLink};
pub use fpm10_types::{EnrollmentData, ImageScan, SearchResult, SystemParameters};
