//! Buffered reader over a serial link
//!
//! UART bytes arrive in arbitrary chunks at arbitrary times. The reader
//! absorbs the chunking in a growable ring buffer and hands out bytes under
//! a wall-clock deadline. While the link has nothing to deliver it sleeps
//! for roughly the transmission time of one byte at the configured baud
//! rate, so polling stays responsive without spinning.

use std::thread;
use std::time::{Duration, Instant};

use crate::{error::Result, SerialLink};

const INITIAL_CAPACITY: usize = 128;

/// Minimum sleep while waiting for the link, in nanoseconds
const MIN_SLEEP_NANOS: u64 = 100;

/// Ring-buffered byte reader with baud-derived poll pacing.
pub struct ByteReader {
    buf: Vec<u8>,
    read_idx: usize,
    write_idx: usize,
    available: usize,
    sleep: Duration,
}

impl ByteReader {
    /// Create a reader paced for the given baud rate.
    pub fn new(baud_rate: u32) -> Self {
        // one byte takes 8 bit times on the wire, give or take framing
        let nanos_per_byte =
            ((1_000_000_000u64 / u64::from(baud_rate.max(1))) * 8).max(MIN_SLEEP_NANOS);

        Self {
            buf: vec![0; INITIAL_CAPACITY],
            read_idx: 0,
            write_idx: 0,
            available: 0,
            sleep: Duration::from_nanos(nanos_per_byte),
        }
    }

    /// Read a single byte, waiting up to `timeout` for it to arrive.
    ///
    /// Returns `Ok(None)` when the deadline expires first.
    pub fn read_byte(
        &mut self,
        link: &mut dyn SerialLink,
        timeout: Duration,
    ) -> Result<Option<u8>> {
        self.fill(link, 1, timeout)?;
        if self.available == 0 {
            return Ok(None);
        }

        Ok(Some(self.pop()))
    }

    /// Read exactly `count` bytes, waiting up to `timeout` for all of them.
    ///
    /// Returns `Ok(None)` when the deadline expires before enough bytes
    /// arrive; no bytes are consumed in that case.
    pub fn read_exact(
        &mut self,
        link: &mut dyn SerialLink,
        count: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        self.fill(link, count, timeout)?;
        if self.available < count {
            return Ok(None);
        }

        Ok(Some((0..count).map(|_| self.pop()).collect()))
    }

    /// Pull bytes from the link until `count` are buffered or the deadline
    /// expires.
    fn fill(&mut self, link: &mut dyn SerialLink, count: usize, timeout: Duration) -> Result<()> {
        if count <= self.available {
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        let mut scratch = [0u8; 256];

        while self.available < count {
            if Instant::now() >= deadline {
                return Ok(());
            }

            let received = link.read_available(&mut scratch)?;
            if received == 0 {
                thread::sleep(self.sleep);
                continue;
            }

            for &byte in &scratch[..received] {
                self.push(byte);
            }
        }

        Ok(())
    }

    fn pop(&mut self) -> u8 {
        debug_assert!(self.available > 0, "pop from an empty ring buffer");

        let byte = self.buf[self.read_idx];
        self.available -= 1;
        self.read_idx = (self.read_idx + 1) % self.buf.len();

        byte
    }

    fn push(&mut self, byte: u8) {
        self.buf[self.write_idx] = byte;
        self.available += 1;
        self.write_idx = (self.write_idx + 1) % self.buf.len();

        if self.available == self.buf.len() {
            self.enlarge();
        }
    }

    /// Double the ring buffer, compacting buffered bytes to the front.
    fn enlarge(&mut self) {
        let mut new_buf = vec![0; self.buf.len() * 2];

        for slot in new_buf.iter_mut().take(self.available) {
            *slot = self.buf[self.read_idx];
            self.read_idx = (self.read_idx + 1) % self.buf.len();
        }

        self.buf = new_buf;
        self.read_idx = 0;
        self.write_idx = self.available;
    }
}
