//! File-backed key-value storage.
//!
//! Values survive process restarts and are protected by:
//! - An exclusive directory lock (single owner of the namespace)
//! - Write-to-temp-then-rename for each value
//! - CRC32 framing to detect corruption on read
//!
//! # Layout
//!
//! ```text
//! <dir>/
//! ├── .lock                       flock / LockFileEx target
//! └── geofencing.store.v1.kv      one framed value per key
//! ```

mod codec;
mod file_lock;
mod file_store;

pub use file_lock::FileLock;
pub use file_store::FileKeyValueStore;

use std::path::Path;

use crate::error::StorageError;

/// Configuration for the file-backed store.
#[derive(Debug, Clone)]
pub struct PersistentConfig {
    /// Whether to fsync each value before renaming it into place.
    pub sync_on_write: bool,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self { sync_on_write: true }
    }
}

/// Open or create a file-backed key-value store at `path`.
///
/// # Errors
/// - If the directory cannot be created or accessed
/// - If another owner holds the lock
///
/// # Example
/// ```rust,ignore
/// use geofencing::storage::open_store;
///
/// let kv = open_store("./geofences", None)?;
/// ```
pub fn open_store(
    path: impl AsRef<Path>,
    config: Option<PersistentConfig>,
) -> Result<FileKeyValueStore, StorageError> {
    FileKeyValueStore::open(path.as_ref(), config.unwrap_or_default())
}
