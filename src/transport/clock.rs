//! Monotonic millisecond clock for the reliable-transport primitive.

use std::time::Instant;

/// Monotonic millisecond counter, started once per session and never reset.
///
/// The primitive works with a wrapping 32-bit millisecond timestamp, so
/// `now_ms` wraps after ~49 days instead of saturating.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    start: Instant,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Start a clock at a specific instant.
    pub fn with_start(start: Instant) -> Self {
        Self { start }
    }

    /// Milliseconds since start.
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    /// The instant this clock counts from.
    pub fn start(&self) -> Instant {
        self.start
    }
}
