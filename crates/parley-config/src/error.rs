//! Errors raised while assembling a [`ParleyConfig`](crate::ParleyConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A file exists but could not be read.
    #[error("cannot read {path}")]
    Unreadable {
        /// The file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax error.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax error, or a merged layer that no longer fits the schema
    /// (unknown key, wrong type).
    #[error("configuration does not match schema: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `toml` nor `json`.
    #[error("unsupported configuration format '{0}'")]
    UnsupportedFormat(String),

    /// A dotenv file could not be parsed.
    #[error("invalid dotenv file: {0}")]
    Dotenv(String),

    /// An environment override names a key the schema does not have.
    #[error("unknown configuration key '{key}' in [{section}]")]
    UnknownKey {
        /// Key, lowercased.
        key: String,
        /// Dotted section path, lowercased.
        section: String,
    },

    /// An environment override could not be parsed for its field.
    #[error("{var}: {reason}")]
    BadEnvVar {
        /// Variable name.
        var: String,
        /// Expected shape.
        reason: String,
    },

    /// A value parsed but breaks a constraint.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `server.http_addr`.
        field: String,
        /// The violated constraint.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unknown_key(key: impl Into<String>, section: impl Into<String>) -> Self {
        Self::UnknownKey {
            key: key.into(),
            section: section.into(),
        }
    }

    pub(crate) fn bad_env_var(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadEnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
