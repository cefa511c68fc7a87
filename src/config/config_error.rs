use std::{io, path::PathBuf};

use thiserror::Error;

use crate::config::{config_scope::ConfigScope, format::ConfigFormat};

/// Errors returned by the config manager. None of them leaves the in-memory
/// store partially updated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config manager is not initialized")]
    NotInitialized,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format {0:?}")]
    UnsupportedFormat(ConfigFormat),

    #[error("scope `{0}` is read-only")]
    ReadOnlyScope(ConfigScope),

    #[error("key `{0}` is not defined by any schema")]
    UnknownKey(String),

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("`{key}` cannot be written as {format:?}: {reason}")]
    Unrepresentable {
        key: String,
        format: ConfigFormat,
        reason: String,
    },

    #[error("config `{0}` not found")]
    NotFound(String),

    #[error("config `{0}` is encrypted and no password is set")]
    Encrypted(String),

    #[error("cannot decrypt config `{0}`: wrong password or corrupted file")]
    Decryption(String),

    #[error("checksum mismatch for {0}")]
    ChecksumMismatch(PathBuf),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
