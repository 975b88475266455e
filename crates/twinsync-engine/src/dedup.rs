//! Operation deduplication and feedback-loop suppression
//!
//! Copying A to B makes B's watcher fire; without suppression that event
//! would copy B back to A, whose watcher would fire again, forever. The
//! tracker records a token for every in-flight operation and keeps it for a
//! cooldown after completion, long enough to absorb the echo event the write
//! itself generates on the other side.
//!
//! The cooldown assumes watcher delivery latency well under the window. That
//! holds for local filesystems; under heavy load or multi-second watcher
//! latency a loop is still possible.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::trace;

/// Build the deduplication token for one copy/remove operation
///
/// The token is direction-independent: the two absolute paths are joined in
/// sorted order, so the echo of `A -> B` observed on B maps to the same token
/// as the original operation and is dropped while the token is live.
pub fn op_token(a: &Path, b: &Path) -> String {
    let (first, second) = if a.as_os_str() <= b.as_os_str() {
        (a, b)
    } else {
        (b, a)
    };
    format!("{}::{}", first.display(), second.display())
}

/// Registry of in-flight operation tokens shared by all synchronizers of one
/// orchestrator
#[derive(Debug, Clone)]
pub struct OperationTracker {
    active: Arc<Mutex<HashSet<String>>>,
    cooldown: Duration,
}

impl OperationTracker {
    /// Create a tracker with the given post-completion cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self {
            active: Arc::new(Mutex::new(HashSet::new())),
            cooldown,
        }
    }

    /// Record the token and return `true`, or return `false` if an operation
    /// with the same token is already in flight or cooling down
    ///
    /// This is the sole admission check: a `false` means the caller must skip
    /// the operation entirely, not queue it.
    pub fn try_begin(&self, token: &str) -> bool {
        let inserted = self.active.lock().unwrap().insert(token.to_string());
        trace!("try_begin('{}') -> {}", token, inserted);
        inserted
    }

    /// Release the token after the cooldown elapses
    pub fn end(&self, token: String) {
        let active = Arc::clone(&self.active);
        let cooldown = self.cooldown;
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            active.lock().unwrap().remove(&token);
            trace!("released '{}'", token);
        });
    }

    /// Whether a token is currently held
    pub fn is_active(&self, token: &str) -> bool {
        self.active.lock().unwrap().contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_token_is_direction_independent() {
        let a = PathBuf::from("/data/a/notes.txt");
        let b = PathBuf::from("/data/b/notes.txt");
        assert_eq!(op_token(&a, &b), op_token(&b, &a));
        assert_ne!(op_token(&a, &b), op_token(&a, &a));
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let tracker = OperationTracker::new(Duration::from_millis(50));
        assert!(tracker.try_begin("t"));
        assert!(!tracker.try_begin("t"));
        assert!(tracker.try_begin("other"));
    }

    #[tokio::test]
    async fn test_token_survives_cooldown_then_releases() {
        let tracker = OperationTracker::new(Duration::from_millis(50));
        assert!(tracker.try_begin("t"));
        tracker.end("t".to_string());

        // Still held right after end(): the cooldown absorbs the echo.
        assert!(tracker.is_active("t"));
        assert!(!tracker.try_begin("t"));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!tracker.is_active("t"));
        assert!(tracker.try_begin("t"));
    }
}
