//! Position tracker — the atomic ingestion frontier.
//!
//! Single writer (the scan worker), many readers (health checks, operators
//! polling lag). `advance` is monotone; `set` is the explicit operator
//! rewind path used before a restart.

use std::sync::atomic::{AtomicI64, Ordering};

/// The last successfully processed position (block height or event ID).
#[derive(Debug)]
pub struct PositionTracker {
    position: AtomicI64,
}

impl PositionTracker {
    pub fn new(start: i64) -> Self {
        Self {
            position: AtomicI64::new(start),
        }
    }

    /// Current frontier. Safe for concurrent callers.
    pub fn get(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }

    /// Advance the frontier to `to`. Never moves backwards: a stale call
    /// with a lower position is a no-op.
    pub fn advance(&self, to: i64) {
        self.position.fetch_max(to, Ordering::AcqRel);
    }

    /// Overwrite the frontier, including backwards (operator rewind).
    pub fn set(&self, to: i64) {
        self.position.store(to, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_is_monotone() {
        let tracker = PositionTracker::new(10);
        tracker.advance(15);
        assert_eq!(tracker.get(), 15);
        tracker.advance(12); // stale, ignored
        assert_eq!(tracker.get(), 15);
    }

    #[test]
    fn set_rewinds() {
        let tracker = PositionTracker::new(100);
        tracker.set(2);
        assert_eq!(tracker.get(), 2);
        tracker.advance(3);
        assert_eq!(tracker.get(), 3);
    }
}
