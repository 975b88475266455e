//! Configuration loading utilities
//!
//! Loads YAML or TOML configuration files (dispatched on extension),
//! interpolates `${VAR}` environment references before parsing, and validates
//! the result so the engine only ever sees a well-formed configuration.

use crate::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable consulted for the default config location
pub const CONFIG_PATH_ENV: &str = "TWINSYNC_CONFIG";

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern is valid")
    })
}

/// Configuration loader with common loading patterns
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the default locations
    ///
    /// Tries `$TWINSYNC_CONFIG` first, then `twinsync.yaml` and `config.yaml`
    /// in the working directory.
    pub fn load_default() -> ConfigResult<Config> {
        for path in Self::default_config_paths() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }
        Err(ConfigError::other(
            "no configuration file found (set TWINSYNC_CONFIG or create twinsync.yaml)",
        ))
    }

    /// Load and validate configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = Self::expand_env(&content)?;

        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?
            }
            // YAML is the default format, matching the shipped template.
            _ => serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };

        config.validate()?;
        debug!(
            "Loaded configuration from '{}': {} base dirs, {} file mappings, {} tree mappings",
            path.display(),
            config.base_dirs.len(),
            config.sync_pairs.len(),
            config.sync_folders.len()
        );
        Ok(config)
    }

    /// Replace `${VAR}` references with environment variable values
    pub fn expand_env(content: &str) -> ConfigResult<String> {
        let mut missing = None;
        let expanded = env_var_pattern().replace_all(content, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(ConfigError::Environment { name }),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Save a configuration to a file, format chosen by extension
    pub fn save_to_file<P: AsRef<Path>>(config: &Config, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(config).map_err(|e| {
                ConfigError::Serialization {
                    message: e.to_string(),
                }
            })?,
            _ => serde_yaml::to_string(config)?,
        };
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// A commented default configuration in YAML, for `init-config`
    pub fn default_config_yaml() -> &'static str {
        r#"# twinsync configuration
#
# Every endpoint below is a (baseDir, path) pair: `baseDir` names an entry in
# `baseDirs`, `path` is relative to it. `${VAR}` references are replaced with
# environment variables at load time.

baseDirs:
  a: ${HOME}/sync/a
  b: ${HOME}/sync/b

# Single files kept mirrored in both directions.
syncPairs:
  - name: notes
    source: { baseDir: a, path: notes.txt }
    target: { baseDir: b, path: notes.txt }

# Directory trees kept mirrored recursively. With `delete: true`, files
# removed on the source side are pruned from the target during reconciliation.
syncFolders:
  - name: docs
    source: { baseDir: a, path: docs }
    target: { baseDir: b, path: docs }
    syncOptions:
      delete: false

watchOptions:
  debounceMs: 500
  cooldownMs: 1000
  # pollIntervalMs: 2000   # force a polling watcher (network filesystems)

logging:
  level: info
  # directory: logs        # enable daily-rotated log files
"#
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(env_path));
        }
        paths.push(PathBuf::from("twinsync.yaml"));
        paths.push(PathBuf::from("config.yaml"));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
baseDirs:
  a: /data/a
  b: /data/b
syncPairs:
  - name: notes
    source: { baseDir: a, path: notes.txt }
    target: { baseDir: b, path: notes.txt }
syncFolders:
  - source: { baseDir: a, path: docs }
    target: { baseDir: b, path: docs }
    syncOptions: { delete: true }
watchOptions:
  debounceMs: 250
"#;

    #[test]
    fn test_parse_yaml_shape() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.base_dirs.len(), 2);
        assert_eq!(config.sync_pairs.len(), 1);
        assert_eq!(config.sync_folders.len(), 1);
        assert!(config.sync_folders[0].sync_options.delete);
        assert_eq!(config.watch_options.debounce_ms, 250);
        // Unset options fall back to defaults.
        assert_eq!(config.watch_options.cooldown_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_expand_env() {
        std::env::set_var("TWINSYNC_TEST_ROOT", "/data/root");
        let expanded = ConfigLoader::expand_env("dir: ${TWINSYNC_TEST_ROOT}/a").unwrap();
        assert_eq!(expanded, "dir: /data/root/a");
    }

    #[test]
    fn test_expand_env_missing_var() {
        let err = ConfigLoader::expand_env("dir: ${TWINSYNC_TEST_UNSET_VAR}").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Environment { name } if name == "TWINSYNC_TEST_UNSET_VAR"
        ));
    }

    #[test]
    fn test_load_from_file_validates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("twinsync.yaml");
        // Base dirs in SAMPLE do not exist on disk, so validation must fail.
        std::fs::write(&path, SAMPLE).unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        let yaml = format!(
            "baseDirs:\n  a: {}\n  b: {}\nsyncPairs:\n  - source: {{ baseDir: a, path: f.txt }}\n    target: {{ baseDir: b, path: f.txt }}\n",
            a.display(),
            b.display()
        );
        let path = temp.path().join("twinsync.yaml");
        std::fs::write(&path, yaml).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.sync_pairs.len(), 1);

        let saved = temp.path().join("saved.yaml");
        ConfigLoader::save_to_file(&config, &saved).unwrap();
        let reloaded = ConfigLoader::load_from_file(&saved).unwrap();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn test_default_template_parses() {
        std::env::set_var("HOME", "/home/test");
        let expanded = ConfigLoader::expand_env(ConfigLoader::default_config_yaml()).unwrap();
        let config: Config = serde_yaml::from_str(&expanded).unwrap();
        assert_eq!(config.sync_pairs.len(), 1);
        assert_eq!(config.sync_folders.len(), 1);
    }
}
