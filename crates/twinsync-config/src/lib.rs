//! Configuration management for twinsync
//!
//! This crate owns the normalized configuration the synchronization engine
//! consumes: the named base-directory table, the declared file and tree
//! mappings, watcher options, and logging options. It loads YAML or TOML
//! files, interpolates `${VAR}` environment references, validates the result,
//! and resolves `(base-directory-key, relative-path)` endpoints to absolute
//! paths.
//!
//! File and tree mappings live in separate config lists but are surfaced to
//! the engine as one tagged [`Mapping`] enum, so downstream consumers match
//! exhaustively instead of probing for optional fields.
//!
//! # Examples
//!
//! ```rust,no_run
//! use twinsync_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_from_file("twinsync.yaml").expect("load config");
//! for mapping in config.mappings() {
//!     println!("{}: {}", mapping.kind(), mapping.display_name());
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use twinsync_types::{MappingKind, MappingSummary};

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// One side of a mapping: a base-directory key plus a relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Endpoint {
    /// Key into the base-directory table
    pub base_dir: String,
    /// Path relative to the base directory
    pub path: PathBuf,
}

impl Endpoint {
    /// Display form `baseDir/relative/path` used in names and status output
    pub fn display(&self) -> String {
        format!("{}/{}", self.base_dir, self.path.display())
    }
}

/// A declared file-to-file mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileMapping {
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
    /// Source endpoint
    pub source: Endpoint,
    /// Target endpoint
    pub target: Endpoint,
}

/// Options for a tree mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeOptions {
    /// Remove target entries whose source counterpart no longer exists
    #[serde(default)]
    pub delete: bool,
}

/// A declared directory-to-directory mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeMapping {
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
    /// Source root endpoint
    pub source: Endpoint,
    /// Target root endpoint
    pub target: Endpoint,
    /// Tree-specific options
    #[serde(default)]
    pub sync_options: TreeOptions,
}

/// A mapping of either kind, tagged once at configuration load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    /// Single-file mapping
    File(FileMapping),
    /// Recursive directory mapping
    Tree(TreeMapping),
}

impl Mapping {
    /// The source endpoint
    pub fn source(&self) -> &Endpoint {
        match self {
            Self::File(m) => &m.source,
            Self::Tree(m) => &m.source,
        }
    }

    /// The target endpoint
    pub fn target(&self) -> &Endpoint {
        match self {
            Self::File(m) => &m.target,
            Self::Tree(m) => &m.target,
        }
    }

    /// File or tree
    pub fn kind(&self) -> MappingKind {
        match self {
            Self::File(_) => MappingKind::File,
            Self::Tree(_) => MappingKind::Tree,
        }
    }

    /// Configured name, or a `source <-> target` fallback
    pub fn display_name(&self) -> String {
        let name = match self {
            Self::File(m) => m.name.as_ref(),
            Self::Tree(m) => m.name.as_ref(),
        };
        name.cloned().unwrap_or_else(|| {
            format!("{} <-> {}", self.source().display(), self.target().display())
        })
    }

    /// Status summary for this mapping
    pub fn summary(&self) -> MappingSummary {
        MappingSummary {
            name: self.display_name(),
            source: self.source().display(),
            target: self.target().display(),
            kind: self.kind(),
        }
    }
}

/// Watcher options passed through to the underlying watch subscriptions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Trailing-edge debounce window for event bursts, in milliseconds
    pub debounce_ms: u64,
    /// Cooldown before an operation token is released, in milliseconds
    pub cooldown_ms: u64,
    /// Use a polling watcher with this interval instead of OS notifications
    pub poll_interval_ms: Option<u64>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            cooldown_ms: 1000,
            poll_interval_ms: None,
        }
    }
}

impl WatchConfig {
    /// Debounce window as a [`Duration`]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Token cooldown as a [`Duration`]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Polling interval, if polling was requested
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (`debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Directory for daily-rotated log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Normalized twinsync configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Named base directories every endpoint resolves against
    pub base_dirs: BTreeMap<String, PathBuf>,
    /// File-to-file mappings
    #[serde(default)]
    pub sync_pairs: Vec<FileMapping>,
    /// Directory-to-directory mappings
    #[serde(default)]
    pub sync_folders: Vec<TreeMapping>,
    /// Watcher options
    #[serde(default)]
    pub watch_options: WatchConfig,
    /// Logging options
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve an endpoint to an absolute path via the base-directory table
    pub fn resolve(&self, base_key: &str, relative: &Path) -> ConfigResult<PathBuf> {
        let base = self
            .base_dirs
            .get(base_key)
            .ok_or_else(|| ConfigError::unknown_base_dir(base_key))?;
        Ok(base.join(relative))
    }

    /// Resolve both sides of an endpoint pair
    pub fn resolve_endpoint(&self, endpoint: &Endpoint) -> ConfigResult<PathBuf> {
        self.resolve(&endpoint.base_dir, &endpoint.path)
    }

    /// All mappings as the tagged enum, file mappings first
    pub fn mappings(&self) -> Vec<Mapping> {
        self.sync_pairs
            .iter()
            .cloned()
            .map(Mapping::File)
            .chain(self.sync_folders.iter().cloned().map(Mapping::Tree))
            .collect()
    }

    /// Validate the configuration, collecting every problem found
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.base_dirs.is_empty() {
            errors.push("baseDirs section is empty".to_string());
        }
        for (key, dir) in &self.base_dirs {
            if !dir.is_absolute() {
                errors.push(format!("base directory '{key}' is not absolute: {}", dir.display()));
            } else if !dir.exists() {
                errors.push(format!("base directory '{key}' does not exist: {}", dir.display()));
            }
        }

        if self.sync_pairs.is_empty() && self.sync_folders.is_empty() {
            errors.push("no syncPairs or syncFolders declared".to_string());
        }

        for (index, mapping) in self.mappings().iter().enumerate() {
            for (side, endpoint) in [("source", mapping.source()), ("target", mapping.target())] {
                if !self.base_dirs.contains_key(&endpoint.base_dir) {
                    errors.push(format!(
                        "mapping #{}: unknown {side} base directory '{}'",
                        index + 1,
                        endpoint.base_dir
                    ));
                }
                if endpoint.path.as_os_str().is_empty() {
                    errors.push(format!("mapping #{}: empty {side} path", index + 1));
                }
                if endpoint.path.is_absolute() {
                    errors.push(format!(
                        "mapping #{}: {side} path must be relative: {}",
                        index + 1,
                        endpoint.path.display()
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::validation(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base: &Path) -> Config {
        let mut base_dirs = BTreeMap::new();
        base_dirs.insert("a".to_string(), base.join("a"));
        base_dirs.insert("b".to_string(), base.join("b"));
        Config {
            base_dirs,
            sync_pairs: vec![FileMapping {
                name: Some("notes".to_string()),
                source: Endpoint {
                    base_dir: "a".to_string(),
                    path: PathBuf::from("notes.txt"),
                },
                target: Endpoint {
                    base_dir: "b".to_string(),
                    path: PathBuf::from("notes.txt"),
                },
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_resolve_known_key() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let resolved = config.resolve("a", Path::new("notes.txt")).unwrap();
        assert_eq!(resolved, temp.path().join("a").join("notes.txt"));
    }

    #[test]
    fn test_resolve_unknown_key() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let err = config.resolve("missing", Path::new("x")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBaseDir { key } if key == "missing"));
    }

    #[test]
    fn test_validate_ok() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("a")).unwrap();
        std::fs::create_dir_all(temp.path().join("b")).unwrap();
        let config = test_config(temp.path());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_collects_errors() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = test_config(temp.path());
        config.sync_pairs[0].target.base_dir = "c".to_string();

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        // Missing dirs on disk and the unknown key are both reported.
        assert!(message.contains("does not exist"));
        assert!(message.contains("unknown target base directory 'c'"));
    }

    #[test]
    fn test_mapping_display_name_fallback() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = test_config(temp.path());
        config.sync_pairs[0].name = None;
        let mapping = &config.mappings()[0];
        assert_eq!(mapping.display_name(), "a/notes.txt <-> b/notes.txt");
        assert_eq!(mapping.kind(), MappingKind::File);
    }

    #[test]
    fn test_watch_config_defaults() {
        let watch = WatchConfig::default();
        assert_eq!(watch.debounce(), Duration::from_millis(500));
        assert_eq!(watch.cooldown(), Duration::from_millis(1000));
        assert!(watch.poll_interval().is_none());
    }
}
