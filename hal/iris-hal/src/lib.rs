//! Iris Hardware Abstraction Layer
//!
//! This crate defines the traits that connect the protocol stack to a
//! concrete board: a byte-granular serial port (the radio module) and a
//! millisecond clock. Chip-specific HALs implement these; the protocol
//! crate only ever sees the traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application                            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  iris-protocol (framing, datagrams)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  iris-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ board UART +  │       │ loopback pair │
//! │ timer HAL     │       │ (host tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`port::LinkPort`] - Byte-granular half-duplex serial I/O
//! - [`clock::Clock`] - Monotonic millisecond time source
//!
//! With the `std` feature enabled, [`loopback`] provides a cross-linked
//! in-memory port pair and [`clock::SystemClock`] a wall-clock source,
//! for testing the stack on a host without radio hardware.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod port;

#[cfg(feature = "std")]
pub mod loopback;

// Re-export key traits at crate root for convenience
pub use clock::{Clock, TickClock};
pub use port::LinkPort;

#[cfg(feature = "std")]
pub use clock::SystemClock;
#[cfg(feature = "std")]
pub use loopback::LoopbackPort;
