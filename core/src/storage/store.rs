//! Key → blob stores for timer snapshots

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use hashbrown::HashMap;

use super::{StorageError, snapshot_filename};

/// Persistence collaborator of the registry.
pub trait SnapshotStore {
    fn save_blob(&mut self, key: &str, blob: &str) -> Result<(), StorageError>;

    /// `Ok(None)` when nothing was ever saved under `key`
    fn load_blob(&self, key: &str) -> Result<Option<String>, StorageError>;
}

/// Stores each key as a TOML file in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// The directory is created on first save.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path for a key, rejecting keys that would escape the directory
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.directory.join(snapshot_filename(key)))
    }
}

impl SnapshotStore for FileStore {
    fn save_blob(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.directory).map_err(|source| StorageError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;

        // Write next to the target, then swap it in
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, blob).map_err(|source| StorageError::WriteFile {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|source| StorageError::WriteFile { path, source })
    }

    fn load_blob(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadFile { path, source }),
        }
    }
}

/// In-memory store. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn save_blob(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.blobs
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn load_blob(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key))
    }
}
