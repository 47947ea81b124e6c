//! Control-loop lifetime tracking.
//!
//! # Responsibilities
//! - Count running breaker control loops
//! - Release the count when a loop exits, however it exits

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks live control loops.
#[derive(Debug, Clone, Default)]
pub struct LoopTracker {
    active: Arc<AtomicUsize>,
}

impl LoopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a started loop. Returns a guard that decrements on drop.
    pub fn track(&self) -> LoopGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        LoopGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// Current number of live loops.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Held by a control loop for its whole lifetime.
#[derive(Debug)]
pub struct LoopGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_count_loops() {
        let tracker = LoopTracker::new();
        assert_eq!(tracker.active(), 0);

        let a = tracker.track();
        let b = tracker.clone().track();
        assert_eq!(tracker.active(), 2);

        drop(a);
        assert_eq!(tracker.active(), 1);
        drop(b);
        assert_eq!(tracker.active(), 0);
    }
}
