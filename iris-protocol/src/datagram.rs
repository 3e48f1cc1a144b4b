//! Datagram layer: addressed, unacknowledged messages
//!
//! Prepends a two-octet `[DEST, SRC]` header to every frame and filters
//! inbound frames to those destined for this node or for the broadcast
//! address. Delivery is fire-and-forget; the reliable layer above adds
//! acknowledgements.

use heapless::Vec;
use iris_hal::LinkPort;

use crate::error::Error;
use crate::framer::{Framer, MAX_PAYLOAD};

/// Reserved "deliver to everyone" address
///
/// Never a node's own identity; addressable node identities are 0-254.
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Maximum payload per datagram (frame payload minus the address header)
pub const MAX_DATAGRAM_PAYLOAD: usize = MAX_PAYLOAD - 2;

/// Source, destination, and payload length of an accepted datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Received {
    /// Address of the sending node
    pub from: u8,
    /// Address the datagram was sent to (this node, broadcast, or - in
    /// promiscuous mode - anyone)
    pub to: u8,
    /// Number of payload bytes copied out
    pub len: usize,
}

/// Addressed datagrams over a [`Framer`]
pub struct Datagram<P: LinkPort> {
    framer: Framer<P>,
    this_address: u8,
}

impl<P: LinkPort> Datagram<P> {
    /// Create a datagram endpoint with the given node address
    pub fn new(port: P, this_address: u8) -> Self {
        Self {
            framer: Framer::new(port),
            this_address,
        }
    }

    /// This node's address
    pub fn this_address(&self) -> u8 {
        self.this_address
    }

    /// Change this node's address
    pub fn set_this_address(&mut self, address: u8) {
        self.this_address = address;
    }

    /// Send `payload` to the node at address `to`
    ///
    /// Fails with [`Error::PayloadTooLarge`] before writing anything if
    /// the payload exceeds [`MAX_DATAGRAM_PAYLOAD`].
    pub fn send_to(&mut self, to: u8, payload: &[u8]) -> Result<(), Error<P::Error>> {
        if payload.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(Error::PayloadTooLarge);
        }

        let mut frame: Vec<u8, MAX_PAYLOAD> = Vec::new();
        // capacity checked above
        let _ = frame.push(to);
        let _ = frame.push(self.this_address);
        let _ = frame.extend_from_slice(payload);
        self.framer.send(&frame)
    }

    /// Receive the next datagram addressed to this node or to broadcast
    ///
    /// Non-blocking: drains whatever frames the framer has, dropping
    /// those for other destinations, and returns `Ok(None)` once the
    /// link runs dry. Payload is copied into `buf` with silent
    /// truncation to the buffer's length.
    pub fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<Received>, Error<P::Error>> {
        self.recv_filtered(buf, false)
    }

    /// Receive the next datagram regardless of its destination
    ///
    /// The true destination is still reported, so a monitor can see
    /// traffic between other nodes.
    pub fn recv_promiscuous(&mut self, buf: &mut [u8]) -> Result<Option<Received>, Error<P::Error>> {
        self.recv_filtered(buf, true)
    }

    /// Convenience form of [`Datagram::recv_from`] without the metadata
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Error<P::Error>> {
        Ok(self.recv_from(buf)?.map(|received| received.len))
    }

    fn recv_filtered(
        &mut self,
        buf: &mut [u8],
        promiscuous: bool,
    ) -> Result<Option<Received>, Error<P::Error>> {
        loop {
            let mut inner = [0u8; MAX_PAYLOAD];
            let len = match self.framer.recv(&mut inner) {
                Ok(Some(len)) => len,
                Ok(None) => return Ok(None),
                // Checksum casualties were already consumed below us;
                // keep scanning for the next frame
                Err(Error::BadChecksum) => continue,
                Err(e) => return Err(e),
            };

            // Too short to carry the address header: non-conforming, drop
            if len < 2 {
                continue;
            }

            let (to, from) = (inner[0], inner[1]);
            if !promiscuous && to != self.this_address && to != BROADCAST_ADDRESS {
                continue; // someone else's traffic
            }

            let copied = buf.len().min(len - 2);
            buf[..copied].copy_from_slice(&inner[2..2 + copied]);
            return Ok(Some(Received {
                from,
                to,
                len: copied,
            }));
        }
    }

    /// Block until the port has at least one byte ready
    pub fn wait_available(&mut self) {
        self.framer.wait_available();
    }

    /// Frames dropped by the framer for an implausible length byte
    pub fn rx_bad(&self) -> u8 {
        self.framer.rx_bad()
    }

    /// Frames the framer received with a valid FCS
    pub fn rx_good(&self) -> u8 {
        self.framer.rx_good()
    }
}
