use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes for machine-readable output.
pub mod codes {
    pub const LOG_FROZEN: &str = "LOG_FROZEN";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const CONFIG_READ_FAILED: &str = "CONFIG_READ_FAILED";
    pub const CONFIG_PARSE_FAILED: &str = "CONFIG_PARSE_FAILED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Core error type for featload operations.
///
/// Lookup misses are outcomes, not errors. Index invariant violations are
/// programming errors and panic instead of surfacing here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("loaded features log is frozen; cannot append {feature}")]
    LogFrozen { feature: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn log_frozen(feature: impl Into<String>) -> Self {
        Self::LogFrozen {
            feature: feature.into(),
        }
    }

    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LogFrozen { .. } => codes::LOG_FROZEN,
            Self::Io(_) => codes::IO_ERROR,
            Self::ConfigRead { .. } => codes::CONFIG_READ_FAILED,
            Self::ConfigParse { .. } => codes::CONFIG_PARSE_FAILED,
            Self::Other(_) => codes::INTERNAL,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_frozen_message_and_code() {
        let err = Error::log_frozen("/app/lib/foo.rb");
        assert_eq!(err.code(), codes::LOG_FROZEN);
        assert!(err.to_string().contains("/app/lib/foo.rb"));
        assert!(err.to_string().contains("frozen"));
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), codes::IO_ERROR);
    }
}
