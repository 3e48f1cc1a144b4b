//! Iris messaging protocol stack
//!
//! Reliable point-to-point and broadcast messaging over a "transparent"
//! half-duplex radio transceiver - a link that moves raw bytes and
//! nothing more. The stack supplies, in three thin layers, what the
//! radio does not: framing with error detection, addressing, and
//! acknowledged delivery with retransmission and duplicate suppression.
//!
//! # Layers
//!
//! Each layer owns the one beneath it and adds one header:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ ReliableDatagram   LEN DEST SRC FLAG/SQN payload FCS FCS   │
//! ├────────────────────────────────────────────────────────────┤
//! │ Datagram           LEN DEST SRC payload FCS FCS            │
//! ├────────────────────────────────────────────────────────────┤
//! │ Framer             LEN payload FCS FCS                     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! `LEN` counts every octet of the frame, itself and the FCS included.
//! `FCS` is the one's complement of the CCITT CRC-16 over all preceding
//! octets, transmitted low byte first. `FLAG/SQN` carries the
//! acknowledgement flag in bit 7 and a 7-bit sequence number below it.
//!
//! The whole stack is synchronous and single-threaded: one instance, one
//! owner, one message in flight per direction. Only
//! [`ReliableDatagram::send_to_wait`] and the port's blocking wait ever
//! suspend the caller, and the former only up to its configured
//! timeout-times-retries budget.

#![no_std]
#![deny(unsafe_code)]

// Host tests run against the iris-hal loopback pair
#[cfg(test)]
extern crate std;

pub mod crc;
pub mod datagram;
pub mod error;
pub mod framer;
pub mod reliable;

pub use datagram::{Datagram, Received, BROADCAST_ADDRESS, MAX_DATAGRAM_PAYLOAD};
pub use error::Error;
pub use framer::{Framer, MAX_FRAME_LEN, MAX_PAYLOAD, MIN_FRAME_LEN};
pub use reliable::{
    ReliableDatagram, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS, FLAG_ACK, MAX_RELIABLE_PAYLOAD,
    SEQUENCE_MASK,
};
