//! Framed packet port
//!
//! Wraps a serial link and a byte reader into whole-packet reads and
//! writes: prolog synchronization, length-prefixed payload, checksum
//! verification.

use std::time::{Duration, Instant};

use tracing::trace;

use fpm10_core::packet::{self, PROLOG_LEN};
use fpm10_core::{checksum, Packet, PacketKind};

use crate::{error::Result, ByteReader, SerialLink};

/// Packet-level view of the serial connection to one module.
pub struct FramedPort {
    link: Box<dyn SerialLink>,
    reader: ByteReader,
    address: u32,
    prolog: [u8; PROLOG_LEN],
}

impl FramedPort {
    /// Wrap an (already opened) link, framing packets for the given module
    /// address.
    pub fn new(link: Box<dyn SerialLink>, address: u32) -> Self {
        let reader = ByteReader::new(link.baud_rate());

        Self {
            link,
            reader,
            address,
            prolog: packet::prolog(address),
        }
    }

    /// Module address the prolog is derived from.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Name of the underlying port.
    pub fn port_name(&self) -> String {
        self.link.port_name()
    }

    /// Tear down the port, closing and returning the link for reuse.
    pub fn into_link(mut self) -> Result<Box<dyn SerialLink>> {
        self.link.close()?;
        Ok(self.link)
    }

    /// Emit one packet.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let frame = packet.encode(self.address)?;

        trace!(
            "Sending {}: {:02X?}",
            packet,
            &frame[..frame.len().min(24)]
        );

        self.link.write_all(&frame)
    }

    /// Read one packet, waiting up to `timeout` for the whole frame.
    ///
    /// Synchronizes to the prolog by sliding a match index over the byte
    /// stream; a mismatch resets the index to zero. The header byte `0xEF`
    /// is distinctive and a read is never started while unread data
    /// remains, so no earlier bytes need re-examination.
    ///
    /// Returns `Ok(None)` when the deadline expires at any stage, when the
    /// declared length is shorter than its own checksum, when the packet
    /// kind byte is unknown, or when the checksum does not match. Link
    /// failures surface as `Err`.
    pub fn read_packet(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        let deadline = Instant::now() + timeout;

        // synchronize to the prolog
        let mut matched = 0;
        while matched < PROLOG_LEN {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let byte = match self.reader.read_byte(self.link.as_mut(), remaining)? {
                Some(byte) => byte,
                None => return Ok(None),
            };

            if byte == self.prolog[matched] {
                matched += 1;
            } else {
                matched = 0;
            }
        }

        // kind and declared length
        let metadata = match self.read_exact(3, deadline)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let length = usize::from(u16::from_be_bytes([metadata[1], metadata[2]]));
        if length < 2 {
            return Ok(None);
        }

        let payload = match self.read_exact(length - 2, deadline)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let checksum_bytes = match self.read_exact(2, deadline)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let received = u16::from_be_bytes([checksum_bytes[0], checksum_bytes[1]]);
        if !checksum::verify(metadata[0], &payload, received) {
            trace!(
                "Discarding frame with bad checksum (kind=0x{:02X}, len={})",
                metadata[0],
                length
            );
            return Ok(None);
        }

        let kind = match PacketKind::try_from(metadata[0]) {
            Ok(kind) => kind,
            Err(_) => return Ok(None),
        };

        let packet = Packet::new(kind, payload);
        trace!("Received {}", packet);

        Ok(Some(packet))
    }

    fn read_exact(&mut self, count: usize, deadline: Instant) -> Result<Option<Vec<u8>>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        self.reader.read_exact(self.link.as_mut(), count, remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const ADDRESS: u32 = 0xFFFF_FFFF;
    const TIMEOUT: Duration = Duration::from_millis(50);

    /// In-memory link: reads come from a queue, writes are recorded.
    struct MemoryLink {
        incoming: VecDeque<u8>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl MemoryLink {
        fn new(incoming: &[u8]) -> Self {
            Self {
                incoming: incoming.iter().copied().collect(),
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SerialLink for MemoryLink {
        fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn baud_rate(&self) -> u32 {
            57_600
        }

        fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
            let count = self.incoming.len().min(buf.len());
            for slot in buf.iter_mut().take(count) {
                *slot = self.incoming.pop_front().unwrap();
            }
            Ok(count)
        }

        fn write_all(&mut self, data: &[u8]) -> Result<()> {
            self.written.lock().unwrap().extend_from_slice(data);
            Ok(())
        }

        fn port_name(&self) -> String {
            "memory".into()
        }
    }

    fn port_with(incoming: &[u8]) -> FramedPort {
        FramedPort::new(Box::new(MemoryLink::new(incoming)), ADDRESS)
    }

    #[test]
    fn test_write_verify_password_frame() {
        let link = MemoryLink::new(&[]);
        let written = Arc::clone(&link.written);
        let mut port = FramedPort::new(Box::new(link), ADDRESS);

        let packet = Packet::command(vec![0x13, 0x00, 0x00, 0x00, 0x00]);
        port.write_packet(&packet).unwrap();

        assert_eq!(
            *written.lock().unwrap(),
            vec![
                0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x07, 0x13, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x1B
            ]
        );
    }

    #[test]
    fn test_read_ack_round_trip() {
        let frame = Packet::new(PacketKind::Ack, Bytes::from_static(&[0x00]))
            .encode(ADDRESS)
            .unwrap();
        let mut port = port_with(&frame);

        let packet = port.read_packet(TIMEOUT).unwrap().unwrap();
        assert_eq!(packet.kind, PacketKind::Ack);
        assert_eq!(&packet.payload[..], &[0x00]);
    }

    #[test]
    fn test_round_trip_all_kinds_and_sizes() {
        for kind in [
            PacketKind::Command,
            PacketKind::Data,
            PacketKind::Ack,
            PacketKind::EndData,
        ] {
            for len in [0usize, 1, 17, 128, 256, 1023] {
                let payload: Vec<u8> =
                    (0..len).map(|n| (n as u8).wrapping_mul(31).wrapping_add(7)).collect();
                let wire = Packet::new(kind, payload.clone()).encode(ADDRESS).unwrap();

                let mut port = port_with(&wire);
                let packet = port.read_packet(TIMEOUT).unwrap().unwrap();

                assert_eq!(packet.kind, kind);
                assert_eq!(&packet.payload[..], &payload[..]);
            }
        }
    }

    #[test]
    fn test_read_resynchronizes_after_junk() {
        let frame = Packet::new(PacketKind::Ack, Bytes::from_static(&[0x00]))
            .encode(ADDRESS)
            .unwrap();

        let mut wire = vec![0x00, 0xEF, 0x42, 0xEF, 0x01, 0x13];
        wire.extend_from_slice(&frame);
        let mut port = port_with(&wire);

        let packet = port.read_packet(TIMEOUT).unwrap().unwrap();
        assert_eq!(packet.kind, PacketKind::Ack);
    }

    #[test]
    fn test_read_rejects_short_length() {
        // length 0x0001 cannot even hold the checksum
        let wire = [
            0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x01, 0x00, 0x08,
        ];
        let mut port = port_with(&wire);

        assert!(port.read_packet(TIMEOUT).unwrap().is_none());
    }

    #[test]
    fn test_read_rejects_tampered_payload() {
        let frame = Packet::new(PacketKind::Ack, Bytes::from_static(&[0x00, 0x07, 0x00]))
            .encode(ADDRESS)
            .unwrap();

        for bit in 0..8 {
            for position in 9..frame.len() {
                let mut corrupted = frame.to_vec();
                corrupted[position] ^= 1 << bit;

                let mut port = port_with(&corrupted);
                assert_eq!(
                    port.read_packet(TIMEOUT).unwrap(),
                    None,
                    "bit {bit} at byte {position} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_read_rejects_unknown_kind() {
        // hand-built frame with kind byte 0x05 and a matching checksum
        let payload = [0x00u8];
        let sum = checksum::calculate(0x05, &payload);
        let mut wire = vec![0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x05, 0x00, 0x03, 0x00];
        wire.extend_from_slice(&sum.to_be_bytes());
        let mut port = port_with(&wire);

        assert!(port.read_packet(TIMEOUT).unwrap().is_none());
    }

    #[test]
    fn test_read_times_out_on_partial_frame() {
        // prolog plus metadata, then silence
        let wire = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x05];
        let mut port = port_with(&wire);

        assert!(port.read_packet(Duration::from_millis(20)).unwrap().is_none());
    }

    #[test]
    fn test_read_empty_wire_times_out() {
        let mut port = port_with(&[]);

        let start = Instant::now();
        assert!(port.read_packet(Duration::from_millis(20)).unwrap().is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
