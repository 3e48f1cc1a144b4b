//! Reliable layer: acknowledged, retransmitted, deduplicated datagrams
//!
//! Inserts one FLAG/SQN octet between the address header and the
//! payload: bit 7 is the acknowledgement flag, bits 0-6 a rolling
//! sequence number. [`ReliableDatagram::send_to_wait`] retransmits until
//! a matching acknowledgement arrives or the retry budget runs out;
//! [`ReliableDatagram::recv_from_ack`] acknowledges automatically and
//! suppresses retransmitted duplicates.
//!
//! Exactly one message is in flight per direction - there is no
//! windowing, no session, and no ordering guarantee beyond duplicate
//! avoidance.

use heapless::Vec;
use iris_hal::{Clock, LinkPort};

use crate::datagram::{Datagram, Received, BROADCAST_ADDRESS, MAX_DATAGRAM_PAYLOAD};
use crate::error::Error;

/// Acknowledgement flag in the FLAG/SQN octet
pub const FLAG_ACK: u8 = 0x80;

/// Sequence number mask in the FLAG/SQN octet
pub const SEQUENCE_MASK: u8 = 0x7F;

/// Maximum payload per reliable datagram (FLAG/SQN octet removed)
pub const MAX_RELIABLE_PAYLOAD: usize = MAX_DATAGRAM_PAYLOAD - 1;

/// Default acknowledgement window per transmission attempt
///
/// Must exceed the round-trip time of the request plus the 6-octet
/// acknowledgement frame plus the receiver's latency.
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

/// Default retransmission budget (0 means a single transmission)
pub const DEFAULT_RETRIES: u8 = 3;

/// Acknowledged datagrams over a [`Datagram`], timed by an injected clock
///
/// Owned by exactly one caller; the sequence counter and the last-seen
/// table are not shareable across threads.
pub struct ReliableDatagram<P: LinkPort, C: Clock> {
    datagram: Datagram<P>,
    clock: C,
    /// Last sequence number used for an outgoing send (advanced before
    /// each new send, so the first on-air sequence is 1)
    last_sequence: u8,
    timeout_ms: u32,
    retries: u8,
    /// Last sequence seen from each peer, indexed by address
    ///
    /// Zero-filled: peers start counting at 1, so a peer's first message
    /// can never be mistaken for a duplicate.
    seen: [u8; 256],
}

impl<P: LinkPort, C: Clock> ReliableDatagram<P, C> {
    /// Create a reliable endpoint with the given node address
    pub fn new(port: P, clock: C, this_address: u8) -> Self {
        Self {
            datagram: Datagram::new(port, this_address),
            clock,
            last_sequence: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            seen: [0; 256],
        }
    }

    /// This node's address
    pub fn this_address(&self) -> u8 {
        self.datagram.this_address()
    }

    /// Change this node's address
    pub fn set_this_address(&mut self, address: u8) {
        self.datagram.set_this_address(address);
    }

    /// Set the acknowledgement window per transmission attempt
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    /// Set the retransmission budget (0 means a single transmission)
    pub fn set_retries(&mut self, retries: u8) {
        self.retries = retries;
    }

    /// Send `payload` to `to` and wait for its acknowledgement
    ///
    /// Transmits up to `retries + 1` times, waiting up to the configured
    /// timeout after each attempt. Every retransmission reuses the same
    /// sequence number; that is what lets the receiver recognize it as a
    /// retransmission rather than a new message. Frames other than the
    /// awaited acknowledgement that arrive during the wait are discarded.
    ///
    /// A broadcast returns success right after the first transmission;
    /// broadcasts are never acknowledged.
    ///
    /// Fails with [`Error::NoAck`] once the budget is exhausted, or with
    /// [`Error::Port`] immediately if the port rejects a write.
    pub fn send_to_wait(&mut self, to: u8, payload: &[u8]) -> Result<(), Error<P::Error>> {
        if payload.len() > MAX_RELIABLE_PAYLOAD {
            return Err(Error::PayloadTooLarge);
        }

        self.last_sequence = self.last_sequence.wrapping_add(1) & SEQUENCE_MASK;
        let sequence = self.last_sequence;

        let mut frame: Vec<u8, MAX_DATAGRAM_PAYLOAD> = Vec::new();
        // capacity checked above
        let _ = frame.push(sequence);
        let _ = frame.extend_from_slice(payload);

        for _attempt in 0..=self.retries {
            // The window is measured from the start of transmission
            let sent_at = self.clock.now_ms();
            self.datagram.send_to(to, &frame)?;

            // Never wait for acks to broadcasts
            if to == BROADCAST_ADDRESS {
                return Ok(());
            }

            let mut inner = [0u8; MAX_DATAGRAM_PAYLOAD];
            while self.clock.now_ms().wrapping_sub(sent_at) < self.timeout_ms {
                let Some(received) = self.datagram.recv_from(&mut inner)? else {
                    continue;
                };
                if received.len >= 1
                    && received.from == to
                    && received.to == self.this_address()
                    && inner[0] & FLAG_ACK != 0
                    && inner[0] & SEQUENCE_MASK == sequence
                {
                    return Ok(());
                }
                // Anything else arriving in the window is discarded:
                // one outstanding request, no receive queue
            }
        }
        Err(Error::NoAck)
    }

    /// Receive the next new message for this node, acknowledging it
    ///
    /// Non-blocking like [`Datagram::recv_from`]. Acknowledgement frames
    /// are never surfaced and never themselves acknowledged. A
    /// non-broadcast message is acknowledged to its sender *before*
    /// anything else - also when it turns out to be a retransmitted
    /// duplicate, since a duplicate means the earlier acknowledgement
    /// was lost and re-sending it is the recovery. Duplicates are then
    /// dropped without being surfaced again.
    ///
    /// A peer whose sequence counter wraps past 0 could in principle
    /// land on the zero sentinel recorded before its first message and
    /// be suppressed once; inherent to the 7-bit sequence space and
    /// accepted.
    ///
    /// Fails with [`Error::Port`] if the acknowledgement cannot be
    /// written.
    pub fn recv_from_ack(&mut self, buf: &mut [u8]) -> Result<Option<Received>, Error<P::Error>> {
        loop {
            let mut inner = [0u8; MAX_DATAGRAM_PAYLOAD];
            let Some(received) = self.datagram.recv_from(&mut inner)? else {
                return Ok(None);
            };

            // No FLAG/SQN octet at all: not a reliable-layer frame
            if received.len == 0 {
                continue;
            }

            let flags = inner[0];
            if flags & FLAG_ACK != 0 {
                continue; // never ack an ack
            }
            let sequence = flags & SEQUENCE_MASK;

            if received.to != BROADCAST_ADDRESS {
                self.datagram
                    .send_to(received.from, &[sequence | FLAG_ACK])?;
            }

            if sequence == self.seen[received.from as usize] {
                continue; // retransmitted duplicate, already delivered
            }
            self.seen[received.from as usize] = sequence;

            let copied = buf.len().min(received.len - 1);
            buf[..copied].copy_from_slice(&inner[1..1 + copied]);
            return Ok(Some(Received {
                from: received.from,
                to: received.to,
                len: copied,
            }));
        }
    }

    /// Receive without acknowledging, straight from the datagram layer
    ///
    /// Useful for observing raw traffic - including acknowledgement
    /// frames - on a node that also speaks the reliable protocol.
    pub fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<Received>, Error<P::Error>> {
        self.datagram.recv_from(buf)
    }

    /// Block until the port has at least one byte ready
    pub fn wait_available(&mut self) {
        self.datagram.wait_available();
    }

    /// Frames dropped by the framer for an implausible length byte
    pub fn rx_bad(&self) -> u8 {
        self.datagram.rx_bad()
    }

    /// Frames the framer received with a valid FCS
    pub fn rx_good(&self) -> u8 {
        self.datagram.rx_good()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_hal::{LoopbackPort, TickClock};

    fn reliable_node(port: LoopbackPort, address: u8) -> ReliableDatagram<LoopbackPort, TickClock> {
        ReliableDatagram::new(port, TickClock::new(), address)
    }

    #[test]
    fn test_end_to_end_nodes_11_and_12() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        // Single-threaded harness: the peer cannot answer inside the
        // wait window, so send with a zero budget and collect the ack
        // manually afterwards.
        n11.set_retries(0);
        n11.set_timeout(0);
        assert!(matches!(n11.send_to_wait(12, b"test\0"), Err(Error::NoAck)));

        let mut buf = [0u8; MAX_RELIABLE_PAYLOAD];
        let received = n12.recv_from_ack(&mut buf).unwrap().unwrap();
        assert_eq!(received.from, 11);
        assert_eq!(received.to, 12);
        assert_eq!(received.len, 5);
        assert_eq!(&buf[..5], b"test\0");

        // The acknowledgement is now on the air toward node 11: one
        // octet, ack bit set, first sequence number (1)
        let ack = n11.recv_from(&mut buf).unwrap().unwrap();
        assert_eq!(ack.from, 12);
        assert_eq!(ack.to, 11);
        assert_eq!(ack.len, 1);
        assert_eq!(buf[0], FLAG_ACK | 1);
    }

    #[test]
    fn test_ack_ends_wait() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);

        // Pre-load the matching ack for sequence 1 as if node 12 had
        // already answered
        let mut n12 = Datagram::new(port_b, 12);
        n12.send_to(11, &[FLAG_ACK | 1]).unwrap();

        n11.set_retries(0);
        n11.send_to_wait(12, b"ping").unwrap();
    }

    #[test]
    fn test_wrong_sequence_ack_ignored() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = Datagram::new(port_b, 12);

        // Ack for a sequence we never sent
        n12.send_to(11, &[FLAG_ACK | 9]).unwrap();

        n11.set_retries(0);
        n11.set_timeout(16);
        assert!(matches!(n11.send_to_wait(12, b"ping"), Err(Error::NoAck)));
    }

    #[test]
    fn test_ack_from_wrong_peer_ignored() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n13 = Datagram::new(port_b, 13);

        // Right sequence, wrong source address
        n13.send_to(11, &[FLAG_ACK | 1]).unwrap();

        n11.set_retries(0);
        n11.set_timeout(16);
        assert!(matches!(n11.send_to_wait(12, b"ping"), Err(Error::NoAck)));
    }

    #[test]
    fn test_data_frame_during_wait_discarded() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n13 = Datagram::new(port_b, 13);

        // An unrelated data frame queued ahead of any ack
        n13.send_to(11, &[0x05, b'x']).unwrap();

        n11.set_retries(0);
        n11.set_timeout(16);
        assert!(matches!(n11.send_to_wait(12, b"ping"), Err(Error::NoAck)));

        // Synchronous design: the bystander frame was consumed during
        // the wait, not queued for later
        let mut buf = [0u8; 8];
        assert!(matches!(n11.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_single_transmission_when_retries_zero() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = Datagram::new(port_b, 12);

        n11.set_retries(0);
        n11.set_timeout(4);
        assert!(matches!(n11.send_to_wait(12, b"hi"), Err(Error::NoAck)));

        let mut buf = [0u8; 8];
        assert!(n12.recv_from(&mut buf).unwrap().is_some());
        assert!(matches!(n12.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_retries_reuse_sequence_number() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = Datagram::new(port_b, 12);

        n11.set_retries(2);
        n11.set_timeout(4);
        assert!(matches!(n11.send_to_wait(12, b"hi"), Err(Error::NoAck)));

        // Three transmissions, all carrying sequence 1
        let mut buf = [0u8; 8];
        for _ in 0..3 {
            let received = n12.recv_from(&mut buf).unwrap().unwrap();
            assert_eq!(received.len, 3);
            assert_eq!(buf[0] & FLAG_ACK, 0);
            assert_eq!(buf[0] & SEQUENCE_MASK, 1);
            assert_eq!(&buf[1..3], b"hi");
        }
        assert!(matches!(n12.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_broadcast_returns_immediately_without_ack() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        // Generous budget; a broadcast must not wait on any of it
        n11.send_to_wait(BROADCAST_ADDRESS, b"to all").unwrap();

        let mut buf = [0u8; MAX_RELIABLE_PAYLOAD];
        let received = n12.recv_from_ack(&mut buf).unwrap().unwrap();
        assert_eq!(received.to, BROADCAST_ADDRESS);
        assert_eq!(&buf[..received.len], b"to all");

        // No acknowledgement was produced for the broadcast
        assert!(matches!(n11.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_duplicate_suppressed_and_reacked() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = Datagram::new(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        // The same sequence twice, as a sender whose ack got lost would
        n11.send_to(12, &[0x05, b'h', b'i']).unwrap();
        n11.send_to(12, &[0x05, b'h', b'i']).unwrap();

        let mut buf = [0u8; MAX_RELIABLE_PAYLOAD];
        let received = n12.recv_from_ack(&mut buf).unwrap().unwrap();
        assert_eq!(received.from, 11);
        assert_eq!(received.len, 2);
        assert_eq!(&buf[..2], b"hi");

        // The duplicate is not delivered again
        assert!(matches!(n12.recv_from_ack(&mut buf), Ok(None)));

        // But it was re-acknowledged: two acks on the air toward 11
        for _ in 0..2 {
            let ack = n11.recv_from(&mut buf).unwrap().unwrap();
            assert_eq!(ack.from, 12);
            assert_eq!(buf[0], FLAG_ACK | 0x05);
        }
        assert!(matches!(n11.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_new_sequence_from_same_peer_delivered() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = Datagram::new(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        n11.send_to(12, &[0x01, b'a']).unwrap();
        n11.send_to(12, &[0x02, b'b']).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(n12.recv_from_ack(&mut buf).unwrap().unwrap().len, 1);
        assert_eq!(buf[0], b'a');
        assert_eq!(n12.recv_from_ack(&mut buf).unwrap().unwrap().len, 1);
        assert_eq!(buf[0], b'b');
    }

    #[test]
    fn test_ack_frames_never_surfaced() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = Datagram::new(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        n11.send_to(12, &[FLAG_ACK | 3]).unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(n12.recv_from_ack(&mut buf), Ok(None)));
        // And no ack-of-ack went back
        assert!(matches!(n11.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_broadcast_data_not_acked_but_delivered() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = Datagram::new(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        n11.send_to(BROADCAST_ADDRESS, &[0x07, b'z']).unwrap();

        let mut buf = [0u8; 8];
        let received = n12.recv_from_ack(&mut buf).unwrap().unwrap();
        assert_eq!(received.to, BROADCAST_ADDRESS);
        assert_eq!(buf[0], b'z');
        assert!(matches!(n11.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_oversize_payload_rejected() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = Datagram::new(port_b, 12);

        let payload = [0u8; MAX_RELIABLE_PAYLOAD + 1];
        assert!(matches!(
            n11.send_to_wait(12, &payload),
            Err(Error::PayloadTooLarge)
        ));

        let mut buf = [0u8; 8];
        assert!(matches!(n12.recv_from(&mut buf), Ok(None)));
    }

    #[test]
    fn test_sequence_wraps_after_127() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = reliable_node(port_a, 11);
        let mut n12 = Datagram::new(port_b, 12);

        let mut buf = [0u8; 8];
        for i in 1u32..=129 {
            // Broadcasts return immediately and still advance the counter
            n11.send_to_wait(BROADCAST_ADDRESS, b"x").unwrap();
            let received = n12.recv_from(&mut buf).unwrap().unwrap();
            assert_eq!(received.len, 2);
            assert_eq!(u32::from(buf[0] & SEQUENCE_MASK), i & 0x7F);
        }
    }

    #[test]
    fn test_truncating_receiver_still_acks_in_full() {
        let (port_a, port_b) = LoopbackPort::pair();
        let mut n11 = Datagram::new(port_a, 11);
        let mut n12 = reliable_node(port_b, 12);

        n11.send_to(12, &[0x09, b'0', b'1', b'2', b'3', b'4']).unwrap();

        let mut small = [0u8; 2];
        let received = n12.recv_from_ack(&mut small).unwrap().unwrap();
        assert_eq!(received.len, 2);
        assert_eq!(&small, b"01");

        // Truncation at the application buffer does not affect the ack
        let mut buf = [0u8; 8];
        let ack = n11.recv_from(&mut buf).unwrap().unwrap();
        assert_eq!(buf[..ack.len], [FLAG_ACK | 0x09]);
    }
}
