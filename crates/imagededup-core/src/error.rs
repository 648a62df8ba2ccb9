//! Error types for configuration and signature store access.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A prioritization rule name is not part of the rule registry.
    #[error("Unknown prioritization rule: {name}")]
    UnknownRule { name: String },

    /// A duration string could not be parsed.
    #[error("Invalid duration: {value}")]
    InvalidDuration { value: String },

    /// An exclusion pattern is not a valid regular expression.
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A root directory does not exist or is not a directory.
    #[error("Root is not a directory: {path}")]
    MissingRoot { path: PathBuf },

    /// Any other semantic validation failure.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create a generic validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Errors returned by a [`SignatureStore`](crate::SignatureStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access for the given path failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file could not be turned into a signature (unreadable image etc).
    #[error("Failed to fingerprint {path}: {message}")]
    Fingerprint { path: PathBuf, message: String },

    /// The backend itself failed (network, index, snapshot...).
    #[error("Signature store backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Whether the error means the file itself is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_not_found() {
        let err = StoreError::io(
            "/test/path.jpg",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());

        let err = StoreError::backend("connection refused");
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::UnknownRule {
            name: "prettier-colors".to_string(),
        };
        assert!(err.to_string().contains("prettier-colors"));
    }
}
