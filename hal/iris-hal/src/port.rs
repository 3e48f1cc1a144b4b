//! Serial port abstraction for transparent radio modules
//!
//! The radio is a byte pipe: bytes written on one node come out of the
//! port on every node in range, with no framing or error detection. The
//! protocol stack builds everything else on top of these four
//! primitives, one byte at a time - it never assumes the port buffers
//! more than a single byte on its behalf.

/// Byte-granular serial link to a transparent transceiver
///
/// Implemented by chip-specific UART HALs for real hardware, and by
/// [`crate::loopback::LoopbackPort`] for host tests. Each protocol stack
/// instance owns its port exclusively; there is no shared default port.
pub trait LinkPort {
    /// Error type for write operations
    type Error: core::fmt::Debug;

    /// Write a single byte
    ///
    /// Blocks until the byte has been handed to the transceiver.
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Check whether at least one received byte is ready, without blocking
    fn byte_ready(&mut self) -> bool;

    /// Read one received byte if available, without blocking
    fn read_byte(&mut self) -> Option<u8>;

    /// Block until at least one received byte is ready
    fn wait_ready(&mut self);
}
