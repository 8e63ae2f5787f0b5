//! Directory-backed key-value store.
//!
//! Each key maps to one file `<escaped-key>.kv` holding a single checksummed
//! frame (see [`super::codec`]). Writes go to a temporary sibling which is
//! fsynced and renamed over the target, so readers observe either the old or
//! the new value, never a torn one.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::traits::KeyValueStore;

use super::codec;
use super::file_lock::FileLock;
use super::PersistentConfig;

/// Escapes a key into a portable file stem.
///
/// ASCII alphanumerics, `-`, `_` and `.` pass through; every other byte is
/// written as `%XX`. The mapping is injective.
fn file_stem(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// [`KeyValueStore`] persisted under a locked directory.
#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    config: PersistentConfig,
    write_guard: Mutex<()>,
    _lock: FileLock,
}

impl FileKeyValueStore {
    /// Open or create a store rooted at `dir`.
    ///
    /// # Errors
    /// - `StorageError::Io` if the directory cannot be created
    /// - `StorageError::Locked` if another owner holds the directory
    pub fn open(dir: &Path, config: PersistentConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;

        let lock = FileLock::acquire(dir).map_err(|e| {
            if e.kind() == ErrorKind::WouldBlock {
                StorageError::Locked {
                    path: dir.display().to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;

        debug!(dir = %dir.display(), "opened geofence key-value store");

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            write_guard: Mutex::new(()),
            _lock: lock,
        })
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.kv", file_stem(key)))
    }

    fn write_atomically(&self, path: &Path, frame: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension(format!("kv.tmp.{}", Uuid::new_v4()));

        let result = (|| -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(frame)?;
            file.flush()?;
            if self.config.sync_on_write {
                file.sync_all()?;
            }
            fs::rename(&temp_path, path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::Io(e));
        }
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        let frame = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        codec::decode(&frame)
            .map(Some)
            .map_err(|e| StorageError::Corrupted {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let frame = codec::encode(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::Backend("poisoned lock: file_store.set".to_string()))?;
        self.write_atomically(&self.path_for(key), &frame)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::Backend("poisoned lock: file_store.remove".to_string()))?;
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
