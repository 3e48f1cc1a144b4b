//! Frame layer: length-prefixed, checksummed messages over a byte pipe
//!
//! Frame format:
//! - LENGTH (1 byte): total octet count of the frame, itself and the
//!   FCS included
//! - PAYLOAD (0-61 bytes)
//! - FCS (2 bytes): one's complement CCITT CRC-16 over LENGTH and
//!   PAYLOAD, low byte first
//!
//! Frames carry no addressing; everything sent at this layer is visible
//! to every receiver on the link. Reassembly is pump-driven: each call
//! to [`Framer::available`] pulls whatever bytes the port has ready into
//! an internal buffer, one frame at a time.

use heapless::Vec;
use iris_hal::LinkPort;

use crate::crc;
use crate::error::Error;

/// Maximum total frame length on the wire
///
/// More than 64 octets per message is known to corrupt on some
/// transparent transceivers, whatever their documented buffer size.
pub const MAX_FRAME_LEN: usize = 64;

/// Smallest declared length a receiver accepts
///
/// A frame of LENGTH plus FCS alone is 3 octets; anything shorter than 4
/// cannot carry data for the layers above and is treated as line noise.
pub const MIN_FRAME_LEN: usize = 4;

/// Maximum payload per frame (LENGTH and FCS overhead removed)
pub const MAX_PAYLOAD: usize = MAX_FRAME_LEN - 3;

/// Unaddressed framing over a [`LinkPort`]
///
/// Owns the port exclusively. Holds at most one complete inbound frame;
/// [`Framer::recv`] always consumes it, valid or not, so a corrupt frame
/// can never wedge the buffer.
pub struct Framer<P: LinkPort> {
    port: P,
    rx_buf: Vec<u8, MAX_FRAME_LEN>,
    /// Frames dropped for an implausible length byte (wrapping, diagnostic only)
    rx_bad: u8,
    /// Frames received with a valid FCS (wrapping, diagnostic only)
    rx_good: u8,
}

impl<P: LinkPort> Framer<P> {
    /// Create a framer over the given port
    pub fn new(port: P) -> Self {
        Self {
            port,
            rx_buf: Vec::new(),
            rx_bad: 0,
            rx_good: 0,
        }
    }

    /// Send one frame carrying `payload`
    ///
    /// Blocks until every octet has been handed to the port. Fails with
    /// [`Error::PayloadTooLarge`] before writing anything if the payload
    /// exceeds [`MAX_PAYLOAD`].
    ///
    /// A zero-length payload is transmittable but produces a 3-octet
    /// frame, which conforming receivers drop as an implausible length.
    pub fn send(&mut self, payload: &[u8]) -> Result<(), Error<P::Error>> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge);
        }

        let count = payload.len() as u8 + 3;
        let mut digest = crc::digest();

        digest.update(&[count]);
        self.port.write_byte(count).map_err(Error::Port)?;

        for &byte in payload {
            digest.update(&[byte]);
            self.port.write_byte(byte).map_err(Error::Port)?;
        }

        // FCS goes out low byte first
        let fcs = digest.finalize();
        self.port.write_byte(fcs as u8).map_err(Error::Port)?;
        self.port.write_byte((fcs >> 8) as u8).map_err(Error::Port)?;
        Ok(())
    }

    /// Pump the port and report whether a complete frame is buffered
    ///
    /// Non-blocking: returns false as soon as the port has no byte ready
    /// and the frame is still incomplete.
    ///
    /// The first octet of a new frame is its declared length and is
    /// sanity-checked against [`MIN_FRAME_LEN`]..=[`MAX_FRAME_LEN`]. On
    /// failure the octet is dropped, `rx_bad` is bumped, and every byte
    /// still pending on the port is drained - waiting out a corrupted
    /// length's worth of traffic would stall resynchronization far
    /// longer. A corrupted length that stays within these limits can
    /// still swallow following frames until that many octets arrive; the
    /// FCS catches the damage.
    pub fn available(&mut self) -> bool {
        while self.rx_buf.is_empty() || self.rx_buf.len() < self.rx_buf[0] as usize {
            let Some(byte) = self.port.read_byte() else {
                return false; // no complete frame yet
            };

            if self.rx_buf.is_empty() && !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&(byte as usize))
            {
                self.rx_bad = self.rx_bad.wrapping_add(1);
                while self.port.read_byte().is_some() {}
            } else {
                // length already validated <= MAX_FRAME_LEN == capacity
                let _ = self.rx_buf.push(byte);
            }
        }
        true
    }

    /// Take the buffered frame, if any
    ///
    /// Returns `Ok(None)` when no complete frame is available. Otherwise
    /// the frame is consumed either way: with a good FCS its payload is
    /// copied into `buf` (silently truncated to the buffer's length) and
    /// the copied count returned; with a bad FCS nothing is copied and
    /// the call fails with [`Error::BadChecksum`].
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Error<P::Error>> {
        if !self.available() {
            return Ok(None);
        }

        let frame_len = self.rx_buf[0] as usize;
        if !crc::frame_ok(&self.rx_buf) {
            self.rx_buf.clear();
            return Err(Error::BadChecksum);
        }

        let copied = buf.len().min(frame_len - 3);
        buf[..copied].copy_from_slice(&self.rx_buf[1..1 + copied]);
        self.rx_good = self.rx_good.wrapping_add(1);
        self.rx_buf.clear();
        Ok(Some(copied))
    }

    /// Block until the port has at least one byte ready
    pub fn wait_available(&mut self) {
        self.port.wait_ready();
    }

    /// Frames dropped for an implausible length byte since creation
    pub fn rx_bad(&self) -> u8 {
        self.rx_bad
    }

    /// Frames received with a valid FCS since creation
    pub fn rx_good(&self) -> u8 {
        self.rx_good
    }
}
