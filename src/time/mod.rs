/*!
 * Tick Clock
 *
 * Global tick counter advanced by an external timer collaborator. The
 * counter sits behind its own spinlock, independent of the process table
 * lock, and only ever moves forward.
 */

use crate::core::types::Tick;
use crate::sync::SpinLock;

/// Monotonic tick counter
pub struct TickClock {
    ticks: SpinLock<Tick>,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: SpinLock::new("ticks", 0),
        }
    }

    /// Current tick count
    pub fn now(&self) -> Tick {
        *self.ticks.lock()
    }

    /// Advance the counter by one tick, returning the new value
    pub fn advance(&self) -> Tick {
        let mut ticks = self.ticks.lock();
        *ticks += 1;
        *ticks
    }

    /// The lock object itself; timed sleeps hold it to close the window
    /// between reading the count and suspending
    pub(crate) fn counter(&self) -> &SpinLock<Tick> {
        &self.ticks
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(TickClock::new().now(), 0);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let clock = TickClock::new();
        let mut last = clock.now();
        for _ in 0..100 {
            let next = clock.advance();
            assert!(next > last);
            last = next;
        }
        assert_eq!(clock.now(), 100);
    }
}
