//! Monotonic millisecond time source
//!
//! The reliable layer needs to know when an acknowledgement window has
//! elapsed. It takes the clock as an explicit dependency so the same
//! retry logic runs against a hardware timer on a board and against a
//! deterministic fake in host tests.

use core::cell::Cell;

/// Monotonic millisecond counter
///
/// Consumers compare instants with wrapping arithmetic, so wrapping at
/// `u32::MAX` milliseconds (about 49 days) is harmless as long as no
/// single timeout approaches the wrap period.
pub trait Clock {
    /// Milliseconds since some fixed, arbitrary epoch
    fn now_ms(&self) -> u32;
}

/// Deterministic clock that advances 1 ms per query
///
/// Every call to [`Clock::now_ms`] returns a value one greater than the
/// last. A timeout of `n` milliseconds therefore spans exactly `n` polls
/// of the clock, which makes retry/timeout paths testable without
/// wall-clock sleeps.
#[derive(Debug, Default)]
pub struct TickClock {
    now: Cell<u32>,
}

impl TickClock {
    /// Create a clock starting at 0 ms
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at the given instant
    pub fn starting_at(ms: u32) -> Self {
        Self { now: Cell::new(ms) }
    }
}

impl Clock for TickClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(1));
        now
    }
}

/// Wall clock measured from construction (host only)
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct SystemClock {
    epoch: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Create a clock whose epoch is "now"
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_clock_advances_per_query() {
        let clock = TickClock::new();
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.now_ms(), 1);
        assert_eq!(clock.now_ms(), 2);
    }

    #[test]
    fn test_tick_clock_starting_at_wraps() {
        let clock = TickClock::starting_at(u32::MAX);
        assert_eq!(clock.now_ms(), u32::MAX);
        assert_eq!(clock.now_ms(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
