//! Nibble codec for image transfer
//!
//! Image buffers cross the wire at half resolution in depth: each byte
//! carries two horizontally adjacent pixels, the left one in the high
//! nibble. Expansion multiplies each nibble by 16, so only the upper four
//! bits of intensity survive a round trip.

use bytes::{BufMut, BytesMut};

/// Expand packed wire bytes into 8-bit pixels, appending to `pixels`.
///
/// Stops appending once `limit` pixels are present; surplus wire bytes are
/// discarded. `limit` is expected to be even, matching the sensor's image
/// geometry.
pub fn expand_nibbles_into(packed: &[u8], pixels: &mut Vec<u8>, limit: usize) {
    for &byte in packed {
        if pixels.len() >= limit {
            break;
        }

        pixels.push((byte >> 4) * 16);
        pixels.push((byte & 0x0F) * 16);
    }
}

/// Pack 8-bit pixels into wire bytes, two pixels per byte.
///
/// The exact inverse of [`expand_nibbles_into`] for pixel values that are
/// multiples of 16; for arbitrary values the low four bits are dropped.
pub fn pack_nibbles(pixels: &[u8]) -> BytesMut {
    let mut packed = BytesMut::with_capacity((pixels.len() + 1) / 2);

    for pair in pixels.chunks(2) {
        let high = pair[0] >> 4;
        let low = if pair.len() == 2 { pair[1] >> 4 } else { 0 };
        packed.put_u8((high << 4) | low);
    }

    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_two_pixels_per_byte() {
        let mut pixels = Vec::new();
        expand_nibbles_into(&[0xA3], &mut pixels, 16);

        assert_eq!(pixels, vec![0xA0, 0x30]);
    }

    #[test]
    fn test_round_trip_identity_on_nibble_multiples() {
        let pixels: Vec<u8> = (0..16u8).map(|n| n * 16).collect();

        let packed = pack_nibbles(&pixels);
        let mut expanded = Vec::new();
        expand_nibbles_into(&packed, &mut expanded, pixels.len());

        assert_eq!(expanded, pixels);
    }

    #[test]
    fn test_round_trip_truncates_low_bits() {
        let pixels = vec![0x17, 0xFF, 0x08, 0xA9];

        let packed = pack_nibbles(&pixels);
        let mut expanded = Vec::new();
        expand_nibbles_into(&packed, &mut expanded, pixels.len());

        let expected: Vec<u8> = pixels.iter().map(|&p| (p >> 4) * 16).collect();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_expand_respects_limit() {
        let mut pixels = Vec::new();
        expand_nibbles_into(&[0x11, 0x22, 0x33], &mut pixels, 4);

        assert_eq!(pixels.len(), 4);
        assert_eq!(pixels, vec![0x10, 0x10, 0x20, 0x20]);
    }

    #[test]
    fn test_pack_length() {
        let pixels = vec![0u8; 512];
        assert_eq!(pack_nibbles(&pixels).len(), 256);
    }
}
