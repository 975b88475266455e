//! Normalized filesystem change events
//!
//! Raw watcher events are mapped into [`ChangeKind`] as early as possible so
//! the synchronizers dispatch on one small, exhaustive enum instead of the
//! underlying watcher's platform-dependent event taxonomy.

use serde::{Deserialize, Serialize};

/// The kind of filesystem change observed on one side of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A file appeared
    Created,
    /// A file's content changed
    Modified,
    /// A file or directory disappeared
    Removed,
    /// A directory appeared
    DirCreated,
}

impl ChangeKind {
    /// Whether this change carries new content that should be copied
    pub fn is_write(self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::DirCreated => "dir-created",
        };
        f.write_str(s)
    }
}

/// Which side of a mapping an event originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The source endpoint changed; propagate toward the target
    SourceToTarget,
    /// The target endpoint changed; propagate toward the source
    TargetToSource,
}

impl Direction {
    /// The opposite direction
    pub fn flip(self) -> Self {
        match self {
            Self::SourceToTarget => Self::TargetToSource,
            Self::TargetToSource => Self::SourceToTarget,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SourceToTarget => "source->target",
            Self::TargetToSource => "target->source",
        };
        f.write_str(s)
    }
}
