//! Core type system and error handling for twinsync
//!
//! This crate provides the foundational types shared by the twinsync crates:
//!
//! - **Error handling**: the engine-level error type and `Result` alias
//! - **Change events**: the normalized filesystem event model and sync direction
//! - **Status**: the serializable status snapshot consumed by external frontends
//!
//! # Examples
//!
//! ```rust
//! use twinsync_types::{ChangeKind, Direction};
//!
//! let dir = Direction::SourceToTarget;
//! assert_eq!(dir.flip(), Direction::TargetToSource);
//! assert!(ChangeKind::Modified.is_write());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod status;

// Re-export commonly used types
pub use error::{Error, Result};
pub use event::{ChangeKind, Direction};
pub use status::{MappingKind, MappingSummary, SyncStatus};
