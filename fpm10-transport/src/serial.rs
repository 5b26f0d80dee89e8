//! UART link backed by the `serialport` crate

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, warn};

use crate::{error::*, SerialLink};

/// Serial connection to a physical module: 8 data bits, 1 stop bit,
/// no parity, at the configured baud rate.
pub struct UartLink {
    path: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl UartLink {
    /// Create a link for the given port path, not yet opened.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
        }
    }
}

impl SerialLink for UartLink {
    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(Duration::from_millis(10))
            .open()?;

        debug!("Opened {}", self.path);

        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(port) = self.port.take() {
            debug!("Closing {}...", self.path);
            drop(port);
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotOpen)?;

        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(0);
        }

        let count = pending.min(buf.len());
        port.read_exact(&mut buf[..count])?;

        Ok(count)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotOpen)?;

        port.write_all(data)?;
        port.flush()?;

        Ok(())
    }

    fn port_name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for UartLink {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial link to {} dropped while still open", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_create() {
        let link = UartLink::new("/dev/ttyUSB0", 57_600);
        assert!(!link.is_open());
        assert_eq!(link.baud_rate(), 57_600);
        assert_eq!(link.port_name(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_read_requires_open_port() {
        let mut link = UartLink::new("/dev/ttyUSB0", 57_600);
        let mut buf = [0u8; 8];

        assert!(matches!(link.read_available(&mut buf), Err(Error::NotOpen)));
        assert!(matches!(link.write_all(&[0x01]), Err(Error::NotOpen)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut link = UartLink::new("/dev/ttyUSB0", 57_600);
        link.close().unwrap();
        link.close().unwrap();
    }
}
