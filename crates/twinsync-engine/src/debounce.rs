//! Trailing-edge event coalescing
//!
//! Editors save files as bursts of create/write/rename events. Each watcher
//! side owns one [`Debouncer`]: scheduling a new action cancels the pending
//! one, so only the action scheduled after the window of quiescence runs.
//! An action that has already started (the window elapsed) is never
//! cancelled; it runs to completion even if new events arrive.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A coalescing timer for one (mapping, direction) key
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Create a debouncer with the given quiescence window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `action` to run after the window, cancelling any pending
    /// schedule on this debouncer (last event wins)
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let mut slot = self.pending.lock().unwrap();
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Detach so cancelling a later schedule cannot kill a copy that
            // is already in flight.
            tokio::spawn(action);
        }));
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.pending.lock() {
            if let Some(prev) = slot.take() {
                prev.abort();
            }
        }
    }
}
