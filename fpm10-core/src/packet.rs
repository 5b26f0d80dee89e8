//! FPM10 protocol packet structure and encoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    error::{Error, Result},
};

/// Two-byte header opening every packet
pub const PACKET_HEADER: [u8; 2] = [0xEF, 0x01];

/// Length of the prolog: header plus four address bytes
pub const PROLOG_LEN: usize = 6;

/// Build the six-byte prolog for the given module address.
pub fn prolog(address: u32) -> [u8; PROLOG_LEN] {
    let addr = address.to_be_bytes();
    [
        PACKET_HEADER[0],
        PACKET_HEADER[1],
        addr[0],
        addr[1],
        addr[2],
        addr[3],
    ]
}

/// Role of a packet within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Instruction from host to module
    Command = 0x01,

    /// One packet of a multi-packet data stream
    Data = 0x02,

    /// Acknowledgement from the module; first payload byte is the
    /// confirmation code
    Ack = 0x07,

    /// Final packet of a data stream
    EndData = 0x08,
}

impl PacketKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::EndData => "END_DATA",
        }
    }
}

impl From<PacketKind> for u8 {
    fn from(kind: PacketKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            _ => Err(Error::UnknownPacketKind(value)),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// FPM10 protocol packet
///
/// # Wire layout
///
/// ```text
/// ┌──────────┬─────────────┬────────┬──────────┬─────────┬──────────┐
/// │  Header  │   Address   │  Kind  │  Length  │ Payload │ Checksum │
/// │  EF 01   │   4 bytes   │ 1 byte │  2 bytes │ N bytes │  2 bytes │
/// └──────────┴─────────────┴────────┴──────────┴─────────┴──────────┘
/// ```
///
/// All multi-byte values are big-endian. `Length` counts the payload plus
/// the two checksum bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet kind
    pub kind: PacketKind,

    /// Packet payload
    pub payload: Bytes,
}

impl Packet {
    /// Largest payload the 16-bit length field can describe
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - 2;

    /// Create a packet with the given kind and payload.
    pub fn new(kind: PacketKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Create a command packet.
    ///
    /// # Examples
    ///
    /// ```
    /// use fpm10_core::{Packet, PacketKind};
    ///
    /// let packet = Packet::command(vec![0x01]);
    /// assert_eq!(packet.kind, PacketKind::Command);
    /// ```
    pub fn command(payload: impl Into<Bytes>) -> Self {
        Self::new(PacketKind::Command, payload)
    }

    /// Calculate the checksum of this packet.
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.kind as u8, &self.payload)
    }

    /// Encode the complete wire frame for the given module address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if the payload does not fit the
    /// length field.
    pub fn encode(&self, address: u32) -> Result<BytesMut> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(PROLOG_LEN + 5 + self.payload.len());

        buf.put_slice(&prolog(address));
        buf.put_u8(self.kind as u8);
        buf.put_u16((self.payload.len() + 2) as u16);
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        Ok(buf)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("kind", &self.kind)
            .field("payload_len", &self.payload.len())
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[{}](len={})", self.kind, self.payload.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prolog_default_address() {
        assert_eq!(
            prolog(0xFFFF_FFFF),
            [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_prolog_custom_address() {
        assert_eq!(
            prolog(0x1234_5678),
            [0xEF, 0x01, 0x12, 0x34, 0x56, 0x78]
        );
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            PacketKind::Command,
            PacketKind::Data,
            PacketKind::Ack,
            PacketKind::EndData,
        ] {
            assert_eq!(PacketKind::try_from(kind as u8).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let result = PacketKind::try_from(0x42);
        assert!(matches!(result, Err(Error::UnknownPacketKind(0x42))));
    }

    #[test]
    fn test_encode_verify_password() {
        // The documented handshake frame for password 0
        let packet = Packet::command(vec![0x13, 0x00, 0x00, 0x00, 0x00]);
        let encoded = packet.encode(0xFFFF_FFFF).unwrap();

        assert_eq!(
            &encoded[..],
            &[
                0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, // prolog
                0x01, // command
                0x00, 0x07, // length
                0x13, 0x00, 0x00, 0x00, 0x00, // payload
                0x00, 0x1B, // checksum
            ]
        );
    }

    #[test]
    fn test_encode_empty_payload() {
        let packet = Packet::new(PacketKind::EndData, Bytes::new());
        let encoded = packet.encode(0xFFFF_FFFF).unwrap();

        assert_eq!(encoded.len(), PROLOG_LEN + 5);
        assert_eq!(encoded[6], 0x08);
        assert_eq!(&encoded[7..9], &[0x00, 0x02]);
    }
}
