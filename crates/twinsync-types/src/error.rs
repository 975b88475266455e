//! Error types for the synchronization engine
//!
//! Errors in the engine are deliberately coarse: I/O failures are recovered
//! locally by the copy/remove primitives and never surface here, so the
//! remaining variants cover mapping setup and watcher subscription.

/// Main error type for twinsync operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration error (unknown base directory, malformed mapping)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Filesystem watch subscription failed
    #[error("Watch error: {message}")]
    Watch {
        /// Error message from the underlying watcher
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

/// Result type for twinsync operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("unknown base directory 'docs'");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown base directory 'docs'"
        );

        let err = Error::watch("inotify limit reached");
        assert_eq!(err.to_string(), "Watch error: inotify limit reached");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
    }
}
