//! # fpm10-core
//!
//! Core protocol implementation for FPM10-family optical fingerprint
//! modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and wire encoding
//! - Checksum calculation
//! - Instruction and confirmation code definitions
//! - The nibble codec used for image transfer
//! - Protocol constants

pub mod checksum;
pub mod confirmation;
pub mod constants;
pub mod error;
pub mod image;
pub mod instruction;
pub mod packet;

pub use confirmation::ConfirmationCode;
pub use error::{Error, Result};
pub use instruction::{CharBuffer, Instruction};
pub use packet::{Packet, PacketKind};
