//! Error types for configuration management

use std::path::PathBuf;
use thiserror::Error;
use twinsync_types::Error as TwinsyncError;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("I/O error reading config file '{path}': {source}")]
    Io {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file parsing error
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },

    /// A mapping references a base directory key that is not declared
    #[error("Unknown base directory '{key}'")]
    UnknownBaseDir {
        /// The missing base directory key
        key: String,
    },

    /// Environment variable referenced in the config is not set
    #[error("Environment variable '{name}' is not set (referenced as ${{{name}}})")]
    Environment {
        /// Name of the missing variable
        name: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Generic configuration error
    #[error("Configuration error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new unknown-base-directory error
    pub fn unknown_base_dir<S: Into<String>>(key: S) -> Self {
        Self::UnknownBaseDir { key: key.into() }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for TwinsyncError {
    fn from(error: ConfigError) -> Self {
        TwinsyncError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
