//! File-mode synchronizer
//!
//! One [`PairSync`] keeps a single file-to-file mapping mirrored in both
//! directions. It holds no state beyond the resolved endpoints: every event
//! is resolved from the current filesystem rather than cached knowledge, so
//! a missed or reordered event can never wedge the pair.

use crate::debounce::Debouncer;
use crate::dedup::{op_token, OperationTracker};
use crate::fsops;
use crate::status::StatusBoard;
use crate::watch::WatchHandle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};
use twinsync_config::{Config, FileMapping, Mapping, WatchConfig};
use twinsync_types::{ChangeKind, Direction, Error, Result};

/// What initial reconciliation decided for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Source was newer or target missing; copied source over target
    CopiedToTarget,
    /// Target was newer or source missing; copied target over source
    CopiedToSource,
    /// Both sides present with equal modification times
    InSync,
    /// Neither side exists
    BothMissing,
}

/// Synchronizer for one file-to-file mapping
#[derive(Debug)]
pub struct PairSync {
    name: String,
    source: PathBuf,
    target: PathBuf,
    watch: WatchConfig,
    tracker: OperationTracker,
    status: StatusBoard,
}

impl PairSync {
    /// Build a pair synchronizer, resolving both endpoints
    pub fn new(
        mapping: &FileMapping,
        config: &Config,
        tracker: OperationTracker,
        status: StatusBoard,
    ) -> Result<Self> {
        let source = config.resolve_endpoint(&mapping.source)?;
        let target = config.resolve_endpoint(&mapping.target)?;
        let name = Mapping::File(mapping.clone()).display_name();
        Ok(Self {
            name,
            source,
            target,
            watch: config.watch_options.clone(),
            tracker,
            status,
        })
    }

    /// Mapping display name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn local_path(&self, direction: Direction) -> &PathBuf {
        match direction {
            Direction::SourceToTarget => &self.source,
            Direction::TargetToSource => &self.target,
        }
    }

    fn remote_path(&self, direction: Direction) -> &PathBuf {
        match direction {
            Direction::SourceToTarget => &self.target,
            Direction::TargetToSource => &self.source,
        }
    }

    /// One-shot reconciliation before watchers go live
    ///
    /// Only-source copies to target, only-target copies to source, both
    /// present resolves by strictly newer mtime, an exact tie (or neither
    /// side existing) is a no-op.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let source_exists = fs::try_exists(&self.source).await.unwrap_or(false);
        let target_exists = fs::try_exists(&self.target).await.unwrap_or(false);

        let outcome = match (source_exists, target_exists) {
            (true, false) => {
                fsops::copy_file(&self.source, &self.target).await;
                ReconcileOutcome::CopiedToTarget
            }
            (false, true) => {
                fsops::copy_file(&self.target, &self.source).await;
                ReconcileOutcome::CopiedToSource
            }
            (true, true) => {
                let source_mtime = fsops::mtime(&self.source).await;
                let target_mtime = fsops::mtime(&self.target).await;
                match (source_mtime, target_mtime) {
                    (Some(s), Some(t)) if s > t => {
                        fsops::copy_file(&self.source, &self.target).await;
                        ReconcileOutcome::CopiedToTarget
                    }
                    (Some(s), Some(t)) if t > s => {
                        fsops::copy_file(&self.target, &self.source).await;
                        ReconcileOutcome::CopiedToSource
                    }
                    _ => ReconcileOutcome::InSync,
                }
            }
            (false, false) => ReconcileOutcome::BothMissing,
        };

        info!(
            "[{}] Reconciled {} <-> {}: {:?}",
            self.name,
            self.source.display(),
            self.target.display(),
            outcome
        );
        outcome
    }

    /// Handle one debounced event observed on `direction`'s side
    pub async fn handle_event(&self, direction: Direction, kind: ChangeKind, path: PathBuf) {
        if kind == ChangeKind::DirCreated {
            return;
        }

        let local = self.local_path(direction);
        let remote = self.remote_path(direction);
        let token = op_token(local, remote);
        if !self.tracker.try_begin(&token) {
            debug!(
                "[{}] Skipping duplicate operation ({} {})",
                self.name, direction, kind
            );
            return;
        }

        let ok = if kind.is_write() {
            fsops::copy_file(&path, remote).await
        } else {
            fsops::remove_path(remote).await
        };
        if ok {
            self.status.record_sync(&self.name);
        }
        self.tracker.end(token);
    }

    /// Arm watchers on both sides of the pair
    ///
    /// Each side watches its parent directory non-recursively (a watch on
    /// the file itself would be lost when an editor replaces it) and filters
    /// for the exact endpoint path.
    pub fn start_watching(self: &Arc<Self>) -> Result<Vec<WatchHandle>> {
        let mut handles = Vec::with_capacity(2);
        for direction in [Direction::SourceToTarget, Direction::TargetToSource] {
            let side = self.local_path(direction).clone();
            let parent = side
                .parent()
                .ok_or_else(|| Error::config(format!("'{}' has no parent directory", side.display())))?
                .to_path_buf();
            std::fs::create_dir_all(&parent).map_err(|e| {
                Error::io(format!("cannot create '{}': {}", parent.display(), e))
            })?;

            let debouncer = Arc::new(Debouncer::new(self.watch.debounce()));
            let me = Arc::clone(self);
            let label = format!("{}:{}", self.name, direction);
            let handle = WatchHandle::spawn(&parent, false, &self.watch, &label, move |kind, event_path| {
                if event_path != side {
                    return;
                }
                let me = Arc::clone(&me);
                debouncer.schedule(async move {
                    me.handle_event(direction, kind, event_path).await;
                });
            })?;
            handles.push(handle);
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use twinsync_config::Endpoint;

    fn pair_fixture(root: &Path) -> (Config, FileMapping) {
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::create_dir_all(root.join("b")).unwrap();
        let mut config = Config::default();
        config.base_dirs.insert("a".to_string(), root.join("a"));
        config.base_dirs.insert("b".to_string(), root.join("b"));
        let mapping = FileMapping {
            name: Some("notes".to_string()),
            source: Endpoint {
                base_dir: "a".to_string(),
                path: PathBuf::from("notes.txt"),
            },
            target: Endpoint {
                base_dir: "b".to_string(),
                path: PathBuf::from("notes.txt"),
            },
        };
        config.sync_pairs.push(mapping.clone());
        (config, mapping)
    }

    fn new_pair(root: &Path) -> PairSync {
        let (config, mapping) = pair_fixture(root);
        PairSync::new(
            &mapping,
            &config,
            OperationTracker::new(Duration::from_millis(50)),
            StatusBoard::new(),
        )
        .unwrap()
    }

    fn set_mtime(path: &Path, unix_seconds: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(unix_seconds, 0)).unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_only_source() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        std::fs::write(temp.path().join("a/notes.txt"), b"v1").unwrap();

        assert_eq!(pair.reconcile().await, ReconcileOutcome::CopiedToTarget);
        assert_eq!(
            std::fs::read(temp.path().join("b/notes.txt")).unwrap(),
            b"v1"
        );
    }

    #[tokio::test]
    async fn test_reconcile_only_target() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        std::fs::write(temp.path().join("b/notes.txt"), b"v1").unwrap();

        assert_eq!(pair.reconcile().await, ReconcileOutcome::CopiedToSource);
        assert_eq!(
            std::fs::read(temp.path().join("a/notes.txt")).unwrap(),
            b"v1"
        );
    }

    #[tokio::test]
    async fn test_reconcile_newer_wins() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        let source = temp.path().join("a/notes.txt");
        let target = temp.path().join("b/notes.txt");
        std::fs::write(&source, b"new").unwrap();
        std::fs::write(&target, b"old").unwrap();
        set_mtime(&source, 2_000_000);
        set_mtime(&target, 1_000_000);

        assert_eq!(pair.reconcile().await, ReconcileOutcome::CopiedToTarget);
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        assert_eq!(std::fs::read(&source).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_reconcile_tie_is_noop() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        let source = temp.path().join("a/notes.txt");
        let target = temp.path().join("b/notes.txt");
        std::fs::write(&source, b"left").unwrap();
        std::fs::write(&target, b"right").unwrap();
        set_mtime(&source, 1_000_000);
        set_mtime(&target, 1_000_000);

        assert_eq!(pair.reconcile().await, ReconcileOutcome::InSync);
        // Tie: neither side overwritten.
        assert_eq!(std::fs::read(&source).unwrap(), b"left");
        assert_eq!(std::fs::read(&target).unwrap(), b"right");
    }

    #[tokio::test]
    async fn test_reconcile_both_missing() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        assert_eq!(pair.reconcile().await, ReconcileOutcome::BothMissing);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        std::fs::write(temp.path().join("a/notes.txt"), b"v1").unwrap();

        assert_eq!(pair.reconcile().await, ReconcileOutcome::CopiedToTarget);
        // Copy preserved the source mtime, so the second pass sees a tie.
        assert_eq!(pair.reconcile().await, ReconcileOutcome::InSync);
    }

    #[tokio::test]
    async fn test_event_copies_to_opposite_side() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        let source = temp.path().join("a/notes.txt");
        std::fs::write(&source, b"v2").unwrap();

        pair.handle_event(Direction::SourceToTarget, ChangeKind::Modified, source)
            .await;
        assert_eq!(
            std::fs::read(temp.path().join("b/notes.txt")).unwrap(),
            b"v2"
        );
    }

    #[tokio::test]
    async fn test_event_unlink_removes_opposite_side() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        let source = temp.path().join("a/notes.txt");
        std::fs::write(temp.path().join("b/notes.txt"), b"v1").unwrap();

        pair.handle_event(Direction::SourceToTarget, ChangeKind::Removed, source)
            .await;
        assert!(!temp.path().join("b/notes.txt").exists());
    }

    #[tokio::test]
    async fn test_event_skipped_while_token_active() {
        let temp = TempDir::new().unwrap();
        let pair = new_pair(temp.path());
        let source = temp.path().join("a/notes.txt");
        std::fs::write(&source, b"v2").unwrap();

        // Simulate an in-flight operation for this pair.
        let token = op_token(&pair.source, &pair.target);
        assert!(pair.tracker.try_begin(&token));

        pair.handle_event(Direction::SourceToTarget, ChangeKind::Modified, source)
            .await;
        assert!(!temp.path().join("b/notes.txt").exists());
    }
}
