//! Cooperative cancellation (§5): a cheap, clonable flag shared between
//! a drain loop, its publish handle, and whatever holds the other end
//! (a supervisor task, a signal handler). No crate in this codebase's
//! dependency stack reaches for `tokio-util`, so this is a minimal
//! hand-rolled primitive in the same spirit as the assignment solver in
//! `lidar_core::hungarian` — the one piece of plumbing genuinely needed
//! that nothing else already provides.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation signal checked between suspension points, never mid-frame.
/// A frame already in flight always finishes and publishes; cancellation
/// only stops the *next* ingest and unblocks a publish that is waiting on
/// a full channel, so pending output can still drain (§5 "a cancel drains
/// pending published outputs").
#[derive(Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let token = ShutdownToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
