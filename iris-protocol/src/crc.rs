//! Frame check sequence: CCITT CRC-16, one's complement on the wire
//!
//! The CRC runs over every frame octet from `LEN` through the last
//! payload byte, initialized to all-ones. The transmitted FCS is the
//! one's complement of the final register, low byte first. This is
//! CRC-16/IBM-SDLC (X.25): the algorithm's output xor supplies the
//! complement, so [`fcs`] is transmittable as-is.
//!
//! Validation recomputes the CRC over the *entire* received frame, FCS
//! bytes included. An intact frame always leaves the fixed residue
//! [`FCS_SENTINEL`] in the register, whatever its content.

use crc::{Crc, Digest, CRC_16_IBM_SDLC};

static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Raw CRC register value left by any frame whose FCS is intact
pub const FCS_SENTINEL: u16 = 0xF0B8;

/// Start an incremental FCS computation
///
/// Feed it each octet as it is written to the port; `finalize` yields
/// the value for [`fcs`] without a second pass over the payload.
pub(crate) fn digest() -> Digest<'static, u16> {
    CRC16.digest()
}

/// FCS to transmit for the given frame octets (`LEN` through payload)
pub fn fcs(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Validate a complete received frame, both FCS octets included
pub fn frame_ok(frame: &[u8]) -> bool {
    // checksum() xors the register with all-ones on readout, so compare
    // against the complemented sentinel
    CRC16.checksum(frame) == !FCS_SENTINEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_check_value() {
        // CRC-16/X.25 check value for "123456789"
        assert_eq!(fcs(b"123456789"), 0x906E);
    }

    #[test]
    fn test_known_frame_fcs() {
        // LEN=8 frame carrying "test\0"
        assert_eq!(fcs(&[0x08, b't', b'e', b's', b't', 0x00]), 0xE19F);
    }

    #[test]
    fn test_intact_frame_validates() {
        let frame = [0x08, b't', b'e', b's', b't', 0x00, 0x9F, 0xE1];
        assert!(frame_ok(&frame));
    }

    #[test]
    fn test_corrupt_frame_rejected() {
        let mut frame = [0x08, b't', b'e', b's', b't', 0x00, 0x9F, 0xE1];
        for i in 0..frame.len() {
            frame[i] ^= 0x01;
            assert!(!frame_ok(&frame), "flip at {i} went undetected");
            frame[i] ^= 0x01;
        }
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let bytes = [0x0A, 0x0C, 0x0B, b't', b'e', b's', b't', 0x00];
        let mut digest = digest();
        for &byte in &bytes {
            digest.update(&[byte]);
        }
        assert_eq!(digest.finalize(), fcs(&bytes));
    }
}
