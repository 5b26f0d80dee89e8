//! Transport layer for the FPM10 protocol
//!
//! Provides the byte-level serial link abstraction, the buffered reader
//! that absorbs UART chunking, and the framed packet port built on both.

pub mod error;
pub mod framed;
pub mod reader;
pub mod serial;

pub use error::{Error, Result};
pub use framed::FramedPort;
pub use reader::ByteReader;
pub use serial::UartLink;

/// Byte-level serial connection to the module
///
/// The driver talks to the sensor exclusively through this trait, which
/// keeps the `serialport` dependency behind a seam so tests can substitute
/// scripted fakes.
pub trait SerialLink: Send {
    /// Open the connection.
    fn open(&mut self) -> Result<()>;

    /// Close the connection.
    fn close(&mut self) -> Result<()>;

    /// Check if the connection is open.
    fn is_open(&self) -> bool;

    /// Configured speed of the link in bits per second.
    fn baud_rate(&self) -> u32;

    /// Read whatever bytes are currently available, without blocking.
    ///
    /// Returns the number of bytes placed into `buf`; `Ok(0)` means
    /// nothing has arrived yet.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `data` to the link.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Name of the underlying port, for diagnostics.
    fn port_name(&self) -> String;
}
