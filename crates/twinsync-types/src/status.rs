//! Serializable status snapshot for external frontends
//!
//! The status types carry no live watch handles and no raw configuration.
//! Everything here serializes cleanly to JSON with the camelCase field names
//! the dashboard API expects, which is the boundary between the engine and
//! its external consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a mapping mirrors a single file or a directory tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    /// One file on each side
    File,
    /// One directory root on each side, mirrored recursively
    Tree,
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Tree => f.write_str("tree"),
        }
    }
}

/// Display summary of one configured mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSummary {
    /// Mapping name (configured, or derived from the endpoints)
    pub name: String,
    /// Source endpoint as `baseDir/relative/path`
    pub source: String,
    /// Target endpoint as `baseDir/relative/path`
    pub target: String,
    /// File or tree mapping
    #[serde(rename = "type")]
    pub kind: MappingKind,
}

/// Process-wide synchronization status snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Whether the orchestrator is currently running
    pub is_running: bool,
    /// When the orchestrator was last started
    pub start_time: Option<DateTime<Utc>>,
    /// Seconds since start (0 when stopped)
    pub uptime_seconds: u64,
    /// Summaries of every configured mapping
    pub sync_pairs: Vec<MappingSummary>,
    /// Last successful propagation per mapping name
    pub last_sync_times: BTreeMap<String, DateTime<Utc>>,
}

impl SyncStatus {
    /// Compute uptime from a start timestamp against `now`
    pub fn uptime_from(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - start).num_seconds()).unwrap_or(0)
    }
}
