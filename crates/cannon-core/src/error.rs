use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Canonical error type for a ramped load test run.
///
/// Every variant is fatal for the run; nothing is retried locally.
#[derive(Debug, Error)]
pub enum CannonError {
    /// Ramp parameters violate an invariant. Raised before any request is sent.
    #[error("invalid ramp configuration: {0}")]
    Configuration(String),

    /// Auth material is missing or could not be obtained.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// The external load generator failed at a given concurrency level.
    #[error("load generator failed at concurrency {concurrency}: {message}")]
    Invocation {
        /// Concurrency level that was being run.
        concurrency: u32,
        /// Launch error or captured stderr of the generator.
        message: String,
    },

    /// Report file could not be created or written.
    #[error("failed to write {path:?}: {source}")]
    Io {
        /// Destination that failed.
        path: PathBuf,
        source: std::io::Error,
    },

    /// A concatenated report could not be summarized.
    #[error("report error: {0}")]
    Report(String),

    /// Configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CannonError {
    /// Creates a `Configuration` variant.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a `Credentials` variant.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Creates an `Invocation` variant.
    #[must_use]
    pub fn invocation(concurrency: u32, message: impl Into<String>) -> Self {
        Self::Invocation {
            concurrency,
            message: message.into(),
        }
    }

    /// Creates a `Report` variant.
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report(message.into())
    }
}

/// Convenience alias for results returned by cannon operations.
pub type CannonResult<T> = Result<T, CannonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_message_names_level() {
        let err = CannonError::invocation(25, "exit status: 1: connection refused");
        let msg = err.to_string();
        assert!(msg.contains("concurrency 25"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: CannonError = ConfigError::ValidationError("bad level".to_string()).into();
        assert_eq!(err.to_string(), "Configuration validation failed: bad level");
    }
}
