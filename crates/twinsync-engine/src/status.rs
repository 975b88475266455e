//! Shared status board
//!
//! Mutated by the orchestrator (lifecycle) and the synchronizers (last-sync
//! times); read by external frontends through [`StatusBoard::snapshot`],
//! which copies everything out so readers never hold the lock or see live
//! engine state.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use twinsync_types::{MappingSummary, SyncStatus};

#[derive(Debug, Default)]
struct StatusInner {
    is_running: bool,
    start_time: Option<DateTime<Utc>>,
    sync_pairs: Vec<MappingSummary>,
    last_sync_times: BTreeMap<String, DateTime<Utc>>,
}

/// Cloneable handle to the orchestrator's status record
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<StatusInner>>,
}

impl StatusBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service running with the given mapping summaries
    pub fn mark_started(&self, sync_pairs: Vec<MappingSummary>) {
        let mut inner = self.inner.lock().unwrap();
        inner.is_running = true;
        inner.start_time = Some(Utc::now());
        inner.sync_pairs = sync_pairs;
    }

    /// Mark the service stopped
    pub fn mark_stopped(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.is_running = false;
    }

    /// Record a successful propagation for the named mapping
    pub fn record_sync(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_sync_times.insert(name.to_string(), Utc::now());
    }

    /// Copy-on-read snapshot for external consumers
    pub fn snapshot(&self) -> SyncStatus {
        let inner = self.inner.lock().unwrap();
        let uptime_seconds = match (inner.is_running, inner.start_time) {
            (true, Some(start)) => SyncStatus::uptime_from(start, Utc::now()),
            _ => 0,
        };
        SyncStatus {
            is_running: inner.is_running,
            start_time: inner.start_time,
            uptime_seconds,
            sync_pairs: inner.sync_pairs.clone(),
            last_sync_times: inner.last_sync_times.clone(),
        }
    }
}
