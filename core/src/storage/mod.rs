//! Storage module for persisting timer snapshots.
//!
//! A snapshot is a TOML document holding the records of every persistent
//! timer. Stores are plain key → blob maps; `FileStore` writes each key to
//! `{directory}/{key}.toml`.

mod error;
mod snapshot;
mod store;

pub use error::StorageError;
pub use snapshot::{decode_snapshot, encode_snapshot};
pub use store::{FileStore, MemoryStore, SnapshotStore};

use std::path::PathBuf;

/// Default snapshot directory: `~/.local/share/hourglass` (or platform equivalent).
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hourglass")
}

/// File name a snapshot key is stored under.
pub fn snapshot_filename(key: &str) -> String {
    format!("{}.toml", key)
}
