//! Sync orchestrator
//!
//! Owns the set of active synchronizers, drives the service state machine
//! (`stopped -> starting -> running -> stopping -> stopped`, plus
//! `running -> restarting -> running`), and exposes the serializable status
//! snapshot. Watchers are armed before initial reconciliation completes so
//! no event is missed during a slow recursive walk, and flipped to steady
//! state only once reconciliation of every mapping has resolved.

use crate::dedup::OperationTracker;
use crate::pair::PairSync;
use crate::status::StatusBoard;
use crate::tree::TreeSync;
use crate::watch::WatchHandle;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};
use twinsync_config::{Config, Mapping};
use twinsync_types::{Result, SyncStatus};

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No watchers armed
    Stopped,
    /// Building synchronizers and reconciling
    Starting,
    /// Watchers live
    Running,
    /// Tearing watchers down
    Stopping,
    /// Stop-then-start in progress
    Restarting,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Restarting => "restarting",
        };
        f.write_str(s)
    }
}

/// One active synchronizer of either kind
#[derive(Debug, Clone)]
enum SyncUnit {
    Pair(Arc<PairSync>),
    Tree(Arc<TreeSync>),
}

impl SyncUnit {
    fn build(
        mapping: &Mapping,
        config: &Config,
        tracker: OperationTracker,
        status: StatusBoard,
    ) -> Result<Self> {
        match mapping {
            Mapping::File(m) => Ok(Self::Pair(Arc::new(PairSync::new(
                m, config, tracker, status,
            )?))),
            Mapping::Tree(m) => Ok(Self::Tree(Arc::new(TreeSync::new(
                m, config, tracker, status,
            )?))),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Pair(p) => p.name(),
            Self::Tree(t) => t.name(),
        }
    }

    async fn reconcile(&self) {
        match self {
            Self::Pair(p) => {
                p.reconcile().await;
            }
            Self::Tree(t) => {
                t.reconcile().await;
            }
        }
    }

    fn start_watching(&self) -> Result<Vec<WatchHandle>> {
        match self {
            Self::Pair(p) => p.start_watching(),
            Self::Tree(t) => t.start_watching(),
        }
    }
}

/// The synchronization orchestrator
///
/// All registries (operation tracker, status board, watcher handles) are
/// instance state, so independent engines never cross-contaminate.
#[derive(Debug)]
pub struct SyncEngine {
    config: Arc<Config>,
    tracker: OperationTracker,
    status: StatusBoard,
    watchers: Vec<WatchHandle>,
    state: EngineState,
}

impl SyncEngine {
    /// Create an engine from a validated configuration
    pub fn with_config(config: Config) -> Self {
        let tracker = OperationTracker::new(config.watch_options.cooldown());
        Self {
            config: Arc::new(config),
            tracker,
            status: StatusBoard::new(),
            watchers: Vec::new(),
            state: EngineState::Stopped,
        }
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            info!("Engine state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Start synchronization for every configured mapping
    ///
    /// A mapping whose setup fails is logged and skipped; the others
    /// proceed. Reconciliation of all mappings runs concurrently; watchers
    /// are armed while it runs and released to steady state afterwards.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == EngineState::Running {
            warn!("Engine already running, ignoring start");
            return Ok(());
        }
        self.set_state(EngineState::Starting);

        let mut units = Vec::new();
        for mapping in self.config.mappings() {
            match SyncUnit::build(
                &mapping,
                &self.config,
                self.tracker.clone(),
                self.status.clone(),
            ) {
                Ok(unit) => units.push((unit, mapping.summary())),
                Err(e) => error!(
                    "Skipping mapping '{}': {}",
                    mapping.display_name(),
                    e
                ),
            }
        }

        let summaries = units.iter().map(|(_, summary)| summary.clone()).collect();
        self.status.mark_started(summaries);

        // Launch every reconciliation before arming watchers.
        let reconcile_tasks: Vec<_> = units
            .iter()
            .map(|(unit, _)| {
                let unit = unit.clone();
                tokio::spawn(async move { unit.reconcile().await })
            })
            .collect();

        // Arm watchers while reconciliation runs: events fired during the
        // walk are buffered in the handles, not lost.
        let mut handles = Vec::new();
        for (unit, _) in &units {
            match unit.start_watching() {
                Ok(mut unit_handles) => handles.append(&mut unit_handles),
                Err(e) => error!("Cannot watch mapping '{}': {}", unit.name(), e),
            }
        }

        for result in join_all(reconcile_tasks).await {
            if let Err(e) = result {
                error!("Reconciliation task failed: {}", e);
            }
        }
        info!("Initial reconciliation finished for {} mappings", units.len());

        for handle in &handles {
            handle.set_steady();
        }
        self.watchers = handles;

        self.set_state(EngineState::Running);
        info!(
            "Synchronization started for {} mappings ({} watchers)",
            units.len(),
            self.watchers.len()
        );
        Ok(())
    }

    /// Stop synchronization, closing every watch handle; idempotent
    pub async fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.set_state(EngineState::Stopping);
        // Dropping the handles closes the OS subscriptions. In-flight copy
        // operations run to completion on the runtime.
        self.watchers.clear();
        self.status.mark_stopped();
        self.set_state(EngineState::Stopped);
        info!("Synchronization stopped");
    }

    /// Stop and start again with the same configuration
    pub async fn restart(&mut self) -> Result<()> {
        self.set_state(EngineState::Restarting);
        self.stop().await;
        self.start().await
    }

    /// Serializable status snapshot; never exposes handles or raw config
    pub fn status(&self) -> SyncStatus {
        self.status.snapshot()
    }
}
