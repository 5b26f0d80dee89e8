//! Error types for fpm10-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Received packet type byte is not part of the protocol
    #[error("Unknown packet kind: 0x{0:02X}")]
    UnknownPacketKind(u8),

    /// Payload does not fit the 16-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}
