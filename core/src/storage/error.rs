//! Error types for snapshot storage operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading or writing timer snapshots
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read snapshot file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write snapshot file {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create snapshot directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot key '{key}'")]
    InvalidKey { key: String },

    #[error("failed to encode timer snapshot")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to decode timer snapshot")]
    Decode(#[from] toml::de::Error),
}
