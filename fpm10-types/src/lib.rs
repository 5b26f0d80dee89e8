//! Type definitions for the fpm10 fingerprint sensor driver

pub mod error;
pub mod params;
pub mod results;
pub mod scan;

pub use error::{Error, Result};
pub use params::SystemParameters;
pub use results::{EnrollmentData, SearchResult};
pub use scan::ImageScan;
