//! Key-value blob persistence.
//!
//! The draft queue needs only three operations from its storage: read a
//! named value, replace it, and remove it. [`KeyValueStore`] captures exactly
//! that, so the queue logic can run against a directory on disk in the CLI
//! and against memory in tests.
//!
//! ## FileStore layout
//!
//! ```text
//! <dir>/
//! ├── item-store.json        # one file per key
//! └── .item-store.json.tmp   # only exists mid-write
//! ```
//!
//! Writes go through [`write_atomic`]: the new value is written to a
//! temporary sibling and flushed to disk, renamed over the target, and then
//! the directory entry is flushed too (Unix only). A process crash or a power
//! loss mid-write leaves either the old value or the new one, never a torn
//! or empty file. Stale `.tmp` files from an interrupted write are simply
//! overwritten by the next one.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid storage key '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidKey(String),
}

/// Named string values that survive process restarts.
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` when the key has never been written.
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;

    /// Create or replace a value.
    fn set(&self, name: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Replace `path` with `contents` so readers see the old file or the new one.
///
/// The temporary file is `.<name>.tmp` next to `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".{}.tmp", name.to_string_lossy()));

    let mut file = File::create(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)?;
    sync_dir(dir)
}

/// Flush a directory so a rename inside it survives power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Check a key is safe to use as a file name.
pub fn validate_key(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(name.to_string()))
    }
}

/// Directory-backed store: one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_key(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(name)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        write_atomic(&path, value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Values are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.values().remove(name);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(name, value)
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        (**self).remove(name)
    }
}
