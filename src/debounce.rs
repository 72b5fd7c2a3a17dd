//! Bounce rejection for the touched/untouched state.
//!
//! Touch panels bounce just like physical buttons, resistive panels
//! especially so. The filter only accepts a touched-state change once it
//! has persisted for a full bounce interval with no further flips, which
//! bounds worst-case acceptance latency at twice the interval.

use crate::source::TouchPoint;

/// Default bounce interval in milliseconds. Resistive panels typically
/// need 30-40 ms.
pub const DEFAULT_BOUNCE_INTERVAL_MS: u16 = 15;

#[derive(Debug)]
pub struct DebounceFilter {
    interval: u16,
    last_check: u32,
    previous_state: bool,
}

impl Default for DebounceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BOUNCE_INTERVAL_MS)
    }
}

impl DebounceFilter {
    pub fn new(interval_ms: u16) -> Self {
        Self {
            interval: interval_ms,
            last_check: 0,
            previous_state: false,
        }
    }

    /// Change the bounce interval in milliseconds.
    pub fn set_interval(&mut self, interval_ms: u16) {
        self.interval = interval_ms;
    }

    pub fn interval(&self) -> u16 {
        self.interval
    }

    /// Feed one raw sample. Returns the sample once the touched state is
    /// stable, `None` while within the bounce interval or while the state
    /// has flipped and not yet persisted.
    ///
    /// Timestamps are wrapping millisecond counters; comparisons stay
    /// correct across overflow for intervals below half the counter range.
    pub fn settle(&mut self, now: u32, raw: TouchPoint) -> Option<TouchPoint> {
        if now.wrapping_sub(self.last_check) < self.interval as u32 {
            return None;
        }
        let state = raw.is_touched();
        if state != self.previous_state {
            // A flip starts a fresh interval; the working point is not
            // updated until the new state survives it.
            self.previous_state = state;
            self.last_check = now;
            return None;
        }
        self.last_check = now;
        Some(raw)
    }
}
