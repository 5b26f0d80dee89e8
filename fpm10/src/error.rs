//! High-level error types

use fpm10_core::ConfirmationCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Data error: {0}")]
    Types(#[from] fpm10_types::Error),

    #[error("Core protocol error: {0}")]
    Core(#[from] fpm10_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] fpm10_transport::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Sensor is not connected")]
    NotConnected,

    #[error("No valid reply from the sensor within the timeout")]
    NoReply,

    #[error("Invalid response from the sensor: {0}")]
    InvalidResponse(String),

    #[error("Sensor reported: {0}")]
    Sensor(ConfirmationCode),

    #[error("Handshake with the sensor failed: {0}")]
    Handshake(String),

    #[error("Activity cancelled")]
    Cancelled,
}
