//! Error type shared by all three protocol layers
//!
//! Every failure is reported synchronously through the failing call's
//! own return value. Nothing here is fatal: corrupt input is absorbed
//! locally by the framer (with a diagnostic counter bump), and only
//! oversize sends, checksum failures, exhausted retries, and port write
//! failures surface to the caller.

/// Protocol stack errors, generic over the port's write error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Payload exceeds the sending layer's maximum; nothing was written
    PayloadTooLarge,
    /// A complete, length-plausible frame failed FCS validation
    ///
    /// The frame has been consumed; the same frame is never offered
    /// twice.
    BadChecksum,
    /// No matching acknowledgement after all retries
    NoAck,
    /// The underlying port rejected a write; the operation was aborted
    Port(E),
}
