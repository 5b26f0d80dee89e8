//! Protocol constants

/// Module address used until a session reports its own
pub const DEFAULT_MODULE_ADDRESS: u32 = 0xFFFF_FFFF;

/// Default UART speed of a factory-configured module
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// The module's baud-rate control is a multiplier N (1 - 12) of this unit
pub const BAUD_RATE_UNIT: u32 = 9_600;

/// Default timeout for a single command exchange (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Default handshake password
pub const DEFAULT_PASSWORD: u32 = 0;

/// Smallest data-package length the module can be configured with
pub const MIN_DATA_PACKAGE_LENGTH: u16 = 32;
