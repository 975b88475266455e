//! Directory-mode synchronizer
//!
//! One [`TreeSync`] keeps two directory roots mirrored recursively. Initial
//! reconciliation walks the source tree copying anything absent from or
//! strictly older in the target, prunes target-only entries when the
//! mapping's delete option is set, then repeats the walk in the opposite
//! direction. Event handling mirrors individual entries: the observed path
//! is made relative to the watched root and re-rooted on the other side.

use crate::debounce::Debouncer;
use crate::dedup::{op_token, OperationTracker};
use crate::fsops;
use crate::status::StatusBoard;
use crate::watch::WatchHandle;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use twinsync_config::{Config, Mapping, TreeMapping, WatchConfig};
use twinsync_types::{ChangeKind, Direction, Result};

/// Counters from one tree reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeReconcileStats {
    /// Files copied (either direction)
    pub files_copied: u64,
    /// Entries pruned from the target
    pub entries_removed: u64,
    /// Directories created
    pub dirs_created: u64,
}

/// Synchronizer for one directory-to-directory mapping
#[derive(Debug)]
pub struct TreeSync {
    name: String,
    source_root: PathBuf,
    target_root: PathBuf,
    delete: bool,
    watch: WatchConfig,
    tracker: OperationTracker,
    status: StatusBoard,
}

impl TreeSync {
    /// Build a tree synchronizer, resolving both roots
    pub fn new(
        mapping: &TreeMapping,
        config: &Config,
        tracker: OperationTracker,
        status: StatusBoard,
    ) -> Result<Self> {
        let source_root = config.resolve_endpoint(&mapping.source)?;
        let target_root = config.resolve_endpoint(&mapping.target)?;
        let name = Mapping::Tree(mapping.clone()).display_name();
        Ok(Self {
            name,
            source_root,
            target_root,
            delete: mapping.sync_options.delete,
            watch: config.watch_options.clone(),
            tracker,
            status,
        })
    }

    /// Mapping display name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn roots(&self, direction: Direction) -> (&PathBuf, &PathBuf) {
        match direction {
            Direction::SourceToTarget => (&self.source_root, &self.target_root),
            Direction::TargetToSource => (&self.target_root, &self.source_root),
        }
    }

    /// One-shot recursive reconciliation of both directions
    pub async fn reconcile(&self) -> TreeReconcileStats {
        let mut stats = TreeReconcileStats::default();
        fsops::ensure_dir(&self.source_root).await;
        fsops::ensure_dir(&self.target_root).await;

        // Source wins first; with delete enabled this pass also prunes, so
        // the reverse pass cannot resurrect removed entries.
        self.mirror_pass(&self.source_root, &self.target_root, self.delete, &mut stats)
            .await;
        self.mirror_pass(&self.target_root, &self.source_root, false, &mut stats)
            .await;

        info!(
            "[{}] Reconciled trees: {} copied, {} removed, {} dirs created",
            self.name, stats.files_copied, stats.entries_removed, stats.dirs_created
        );
        stats
    }

    /// Walk `from_root`, mirroring into `to_root`; prune extras when asked
    async fn mirror_pass(
        &self,
        from_root: &Path,
        to_root: &Path,
        prune: bool,
        stats: &mut TreeReconcileStats,
    ) {
        let mut pending: Vec<PathBuf> = vec![PathBuf::new()];

        while let Some(rel_dir) = pending.pop() {
            let from_dir = from_root.join(&rel_dir);
            let to_dir = to_root.join(&rel_dir);

            let mut entries = match fs::read_dir(&from_dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "[{}] Cannot read '{}': {}",
                        self.name,
                        from_dir.display(),
                        e
                    );
                    continue;
                }
            };

            let mut seen: HashSet<OsString> = HashSet::new();
            let mut walked_fully = true;
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(
                            "[{}] Error reading '{}': {}",
                            self.name,
                            from_dir.display(),
                            e
                        );
                        walked_fully = false;
                        break;
                    }
                };
                let file_name = entry.file_name();
                seen.insert(file_name.clone());

                let file_type = match entry.file_type().await {
                    Ok(ft) => ft,
                    Err(_) => continue,
                };

                if file_type.is_dir() {
                    let mirror_dir = to_dir.join(&file_name);
                    if !fs::try_exists(&mirror_dir).await.unwrap_or(false)
                        && fsops::ensure_dir(&mirror_dir).await
                    {
                        stats.dirs_created += 1;
                    }
                    pending.push(rel_dir.join(&file_name));
                } else if file_type.is_file() {
                    let from_file = entry.path();
                    let to_file = to_dir.join(&file_name);
                    if Self::needs_copy(&from_file, &to_file).await
                        && fsops::copy_file(&from_file, &to_file).await
                    {
                        stats.files_copied += 1;
                    }
                }
                // Symlinks and special files are left alone.
            }

            // Pruning against a partial listing would delete entries whose
            // source counterparts were simply not reached; only a clean walk
            // of the source directory may prune its mirror.
            if prune {
                if walked_fully {
                    stats.entries_removed += self.prune_dir(&to_dir, &seen).await;
                } else {
                    warn!(
                        "[{}] Skipping prune of '{}': source listing was incomplete",
                        self.name,
                        to_dir.display()
                    );
                }
            }
        }
    }

    /// Copy when the target is absent or strictly older
    async fn needs_copy(from: &Path, to: &Path) -> bool {
        match (fsops::mtime(from).await, fsops::mtime(to).await) {
            (_, None) => true,
            (Some(from_mtime), Some(to_mtime)) => from_mtime > to_mtime,
            (None, Some(_)) => false,
        }
    }

    /// Remove entries of `dir` that the source walk did not see
    async fn prune_dir(&self, dir: &Path, seen: &HashSet<OsString>) -> u64 {
        let mut removed = 0;
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !seen.contains(&entry.file_name()) {
                debug!(
                    "[{}] Pruning '{}' (gone from source)",
                    self.name,
                    entry.path().display()
                );
                if fsops::remove_path(&entry.path()).await {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Handle one debounced event observed under `direction`'s root
    pub async fn handle_event(&self, direction: Direction, kind: ChangeKind, path: PathBuf) {
        let (local_root, remote_root) = self.roots(direction);

        // Should be unreachable: the watcher only reports paths under its
        // root. Dropped rather than acted on.
        let rel = match path.strip_prefix(local_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                warn!(
                    "[{}] Dropping event for '{}': outside watched root '{}'",
                    self.name,
                    path.display(),
                    local_root.display()
                );
                return;
            }
        };
        let mirror = remote_root.join(&rel);

        let token = op_token(&path, &mirror);
        if !self.tracker.try_begin(&token) {
            debug!(
                "[{}] Skipping duplicate operation ({} {})",
                self.name, direction, kind
            );
            return;
        }

        let ok = match kind {
            ChangeKind::Created | ChangeKind::Modified => fsops::copy_file(&path, &mirror).await,
            ChangeKind::DirCreated => fsops::ensure_dir(&mirror).await,
            ChangeKind::Removed => fsops::remove_path(&mirror).await,
        };
        if ok {
            self.status.record_sync(&self.name);
        }
        self.tracker.end(token);
    }

    /// Arm recursive watchers on both roots
    pub fn start_watching(self: &Arc<Self>) -> Result<Vec<WatchHandle>> {
        let mut handles = Vec::with_capacity(2);
        for direction in [Direction::SourceToTarget, Direction::TargetToSource] {
            let (root, _) = self.roots(direction);
            let root = root.clone();
            std::fs::create_dir_all(&root).map_err(|e| {
                twinsync_types::Error::io(format!("cannot create '{}': {}", root.display(), e))
            })?;

            let debouncer = Arc::new(Debouncer::new(self.watch.debounce()));
            let me = Arc::clone(self);
            let label = format!("{}:{}", self.name, direction);
            let handle = WatchHandle::spawn(&root, true, &self.watch, &label, move |kind, event_path| {
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
