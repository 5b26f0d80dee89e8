//! System parameters reported by the module at handshake

use std::fmt;

/// Basic configuration of the module, read once when the session opens.
///
/// The values are immutable for the lifetime of a session; the driver caches
/// them after a successful `ReadSysParam` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    /// Current operation status of the module (1: executing, 0: free)
    pub status_register: u16,

    /// System identifier code
    pub system_identifier_code: u16,

    /// Capacity of the fingerprint flash library (number of slots)
    pub library_capacity: u16,

    /// Matching threshold grade (1 - 5)
    pub security_level: u16,

    /// Module address used in the packet prolog
    pub module_address: u32,

    /// Max payload of a transfer data packet: 32, 64, 128 or 256 bytes
    pub data_package_length: u16,

    /// UART speed of the module in bits per second
    pub baud_rate: u32,
}

impl fmt::Display for SystemParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module[addr=0x{:08X}, capacity={}, security={}, pkt={}B, baud={}]",
            self.module_address,
            self.library_capacity,
            self.security_level,
            self.data_package_length,
            self.baud_rate
        )
    }
}
