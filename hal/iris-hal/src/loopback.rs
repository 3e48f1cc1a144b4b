//! Cross-linked in-memory port pair for host tests
//!
//! [`LoopbackPort::pair`] returns two ports wired back to back: bytes
//! written on one become readable on the other, in order and without
//! loss. This stands in for a pair of radio modules in range of each
//! other, so the whole stack can be exercised on a host.
//!
//! The pair is single-threaded by construction (shared `Rc` queues), in
//! keeping with the stack's single-owner concurrency model.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use crate::port::LinkPort;

type Queue = Rc<RefCell<VecDeque<u8>>>;

/// One end of a cross-linked port pair
#[derive(Debug)]
pub struct LoopbackPort {
    /// Bytes this port will read (filled by the peer's writes)
    rx: Queue,
    /// Bytes this port has written (read by the peer)
    tx: Queue,
}

impl LoopbackPort {
    /// Create two ports wired to each other
    pub fn pair() -> (LoopbackPort, LoopbackPort) {
        let a_to_b: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let b_to_a: Queue = Rc::new(RefCell::new(VecDeque::new()));

        let a = LoopbackPort {
            rx: Rc::clone(&b_to_a),
            tx: Rc::clone(&a_to_b),
        };
        let b = LoopbackPort {
            rx: a_to_b,
            tx: b_to_a,
        };
        (a, b)
    }
}

impl LinkPort for LoopbackPort {
    type Error = Infallible;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.tx.borrow_mut().push_back(byte);
        Ok(())
    }

    fn byte_ready(&mut self) -> bool {
        !self.rx.borrow().is_empty()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.borrow_mut().pop_front()
    }

    fn wait_ready(&mut self) {
        // Single-threaded harness: nothing can arrive while we spin, so
        // a byte must already be pending or the caller has a bug.
        assert!(
            self.byte_ready(),
            "LoopbackPort::wait_ready would block forever: no byte pending"
        );
    }
}
