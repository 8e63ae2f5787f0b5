//! Abstract key-value storage trait.
//!
//! The geofence mapping lives under a single key in a process-shared durable
//! namespace. Backends only need to move opaque bytes; the mapping's encoding
//! belongs to [`crate::store::GeofenceStore`].

use crate::error::StorageError;

/// Durable key-value namespace.
///
/// # Contract
/// - `set` returns only after the value is durable (or has failed)
/// - `get` of a key never written returns `Ok(None)`
/// - `remove` of an absent key is `Ok(())`
/// - Implementations must be safe to share across threads
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete the value stored under `key`.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
