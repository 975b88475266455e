//! Filesystem watch handles
//!
//! A [`WatchHandle`] owns one OS-level watch subscription (or a polling
//! fallback when the configuration asks for it) and the task that forwards
//! its events into the synchronizers. Handles start in an *arming* state in
//! which events are buffered; once the orchestrator has finished initial
//! reconciliation for every mapping it flips each handle to steady state and
//! the buffer drains through the normal dispatch path. Nothing observed
//! during a slow recursive reconciliation is lost, and nothing races it.
//!
//! Closing a handle is dropping it: the subscription and the forwarding task
//! go away together.

use notify::event::{CreateKind, EventKind, ModifyKind};
use notify::{
    recommended_watcher, Config as NotifyConfig, Event, PollWatcher, RecommendedWatcher,
    RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use twinsync_config::WatchConfig;
use twinsync_types::{ChangeKind, Error, Result};

enum WatcherBackend {
    Recommended(RecommendedWatcher),
    Poll(PollWatcher),
}

impl WatcherBackend {
    fn watch(&mut self, path: &Path, mode: RecursiveMode) -> notify::Result<()> {
        match self {
            Self::Recommended(w) => w.watch(path, mode),
            Self::Poll(w) => w.watch(path, mode),
        }
    }
}

enum WatchMessage {
    Event(ChangeKind, PathBuf),
    Release,
}

/// Map a raw notify event onto the normalized change model
///
/// Rename halves are resolved by existence: the path a rename left behind is
/// a removal, the one it produced is a creation. Access and metadata-only
/// noise for directories is dropped.
fn normalize(event: &Event) -> Vec<(ChangeKind, PathBuf)> {
    let mut changes = Vec::new();
    for path in &event.paths {
        let kind = match &event.kind {
            EventKind::Create(CreateKind::Folder) => ChangeKind::DirCreated,
            EventKind::Create(_) => {
                if path.is_dir() {
                    ChangeKind::DirCreated
                } else {
                    ChangeKind::Created
                }
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                if path.is_dir() {
                    ChangeKind::DirCreated
                } else if path.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Removed
                }
            }
            EventKind::Modify(_) | EventKind::Any => {
                if path.is_dir() {
                    continue;
                }
                ChangeKind::Modified
            }
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Access(_) | EventKind::Other => continue,
        };
        changes.push((kind, path.clone()));
    }
    changes
}

/// One armed watch subscription plus its dispatch task
pub struct WatchHandle {
    // Dropping the backend cancels the OS subscription.
    _backend: WatcherBackend,
    tx: mpsc::UnboundedSender<WatchMessage>,
    forward: JoinHandle<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

impl WatchHandle {
    /// Arm a watch on `path` and dispatch normalized events to `on_event`
    ///
    /// Events are buffered until [`set_steady`](Self::set_steady) is called.
    /// Watcher errors are logged and leave the handle degraded; they never
    /// propagate.
    pub fn spawn<F>(path: &Path, recursive: bool, watch: &WatchConfig, label: &str, on_event: F) -> Result<Self>
    where
        F: Fn(ChangeKind, PathBuf) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let event_tx = tx.clone();
        let handler_label = label.to_string();
        let handler = move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for (kind, event_path) in normalize(&event) {
                    let _ = event_tx.send(WatchMessage::Event(kind, event_path));
                }
            }
            Err(e) => warn!("[{}] Watcher error: {}", handler_label, e),
        };

        let mut backend = match watch.poll_interval() {
            Some(interval) => {
                let config = NotifyConfig::default().with_poll_interval(interval);
                WatcherBackend::Poll(
                    PollWatcher::new(handler, config).map_err(|e| Error::watch(e.to_string()))?,
                )
            }
            None => WatcherBackend::Recommended(
                recommended_watcher(handler).map_err(|e| Error::watch(e.to_string()))?,
            ),
        };

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        backend
            .watch(path, mode)
            .map_err(|e| Error::watch(format!("cannot watch '{}': {}", path.display(), e)))?;

        let forward_label = label.to_string();
        let forward = tokio::spawn(async move {
            let mut steady = false;
            let mut buffered: Vec<(ChangeKind, PathBuf)> = Vec::new();
            while let Some(message) = rx.recv().await {
                match message {
                    WatchMessage::Release => {
                        steady = true;
                        if !buffered.is_empty() {
                            debug!(
                                "[{}] Releasing {} events observed during reconciliation",
                                forward_label,
                                buffered.len()
                            );
                        }
                        for (kind, event_path) in buffered.drain(..) {
                            on_event(kind, event_path);
                        }
                    }
                    WatchMessage::Event(kind, event_path) => {
                        if steady {
                            on_event(kind, event_path);
                        } else {
                            buffered.push((kind, event_path));
                        }
                    }
                }
            }
        });

        debug!("[{}] Watching {} ({:?})", label, path.display(), mode);
        Ok(Self {
            _backend: backend,
            tx,
            forward,
        })
    }

    /// Switch from arming to steady state, draining buffered events
    pub fn set_steady(&self) {
        let _ = self.tx.send(WatchMessage::Release);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    async fn recv_with_deadline(
        rx: &mut mpsc::UnboundedReceiver<(ChangeKind, PathBuf)>,
    ) -> Option<(ChangeKind, PathBuf)> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_events_buffer_until_steady() {
        let temp = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = WatchHandle::spawn(
            temp.path(),
            true,
            &WatchConfig::default(),
            "test",
            move |kind, path| {
                let _ = tx.send((kind, path));
            },
        )
        .unwrap();

        let file = temp.path().join("armed.txt");
        std::fs::write(&file, b"x").unwrap();

        // Not steady yet: nothing may come through.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());

        handle.set_steady();
        let (_, path) = recv_with_deadline(&mut rx).await.expect("buffered event");
        assert_eq!(path, file);
    }

    #[tokio::test]
    async fn test_steady_events_flow_directly() {
        let temp = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = WatchHandle::spawn(
            temp.path(),
            true,
            &WatchConfig::default(),
            "test",
            move |kind, path| {
                let _ = tx.send((kind, path));
            },
        )
        .unwrap();
        handle.set_steady();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let file = temp.path().join("live.txt");
        std::fs::write(&file, b"x").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut saw_file = false;
        while Instant::now() < deadline {
            if let Some((kind, path)) = recv_with_deadline(&mut rx).await {
                if path == file && kind.is_write() {
                    saw_file = true;
                    break;
                }
            } else {
                break;
            }
        }
        assert!(saw_file, "expected a write event for {}", file.display());
    }

    #[test]
    fn test_normalize_drops_access_events() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/tmp/x"));
        assert!(normalize(&event).is_empty());
    }

    #[test]
    fn test_normalize_remove() {
        let event = Event::new(EventKind::Remove(notify::event::RemoveKind::File))
            .add_path(PathBuf::from("/tmp/x"));
        let changes = normalize(&event);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].0, ChangeKind::Removed);
    }
}
