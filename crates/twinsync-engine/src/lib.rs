//! Bidirectional synchronization engine for twinsync
//!
//! This crate is the core of twinsync: it reconciles pairs of files or
//! directory trees on startup, watches both sides for filesystem events, and
//! propagates changes in either direction while suppressing the echo events
//! its own writes generate.
//!
//! The moving parts, leaves first:
//!
//! - [`fsops`] — copy/remove primitives that log and never fail upward
//! - [`dedup`] — in-flight operation registry with cooldown-delayed release
//! - [`debounce`] — trailing-edge coalescing timer per mapping direction
//! - [`watch`] — notify-based watch handles with an arming/steady-state gate
//! - [`pair`] / [`tree`] — the file-mode and directory-mode synchronizers
//! - [`status`] — shared status board behind a serializable snapshot
//! - [`engine`] — the orchestrator owning all of the above
//!
//! # Examples
//!
//! ```rust,no_run
//! use twinsync_config::ConfigLoader;
//! use twinsync_engine::SyncEngine;
//!
//! # async fn example() -> twinsync_types::Result<()> {
//! let config = ConfigLoader::load_from_file("twinsync.yaml")?;
//! let mut engine = SyncEngine::with_config(config);
//! engine.start().await?;
//! let status = engine.status();
//! println!("{} mappings active", status.sync_pairs.len());
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod debounce;
pub mod dedup;
pub mod engine;
pub mod fsops;
pub mod pair;
pub mod status;
pub mod tree;
pub mod watch;

// Re-export commonly used types
pub use debounce::Debouncer;
pub use dedup::{op_token, OperationTracker};
pub use engine::{EngineState, SyncEngine};
pub use pair::{PairSync, ReconcileOutcome};
pub use status::StatusBoard;
pub use tree::{TreeReconcileStats, TreeSync};
pub use watch::WatchHandle;
