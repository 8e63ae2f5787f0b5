//! In-memory key-value backend.
//!
//! Intended for embedded usage and tests. Cloning shares the underlying map,
//! which lets a test "restart" a manager against the same namespace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::StorageError;
use crate::storage::traits::KeyValueStore;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct Shared {
    values: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

/// Thread-safe in-memory [`KeyValueStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    shared: Arc<Shared>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set`/`remove` calls so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.shared.writes.load(Ordering::Relaxed)
    }

    /// Makes every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Stores raw bytes, bypassing failure injection. Used to seed fixtures.
    pub fn seed(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut values = self.shared.values.write().map_err(|_| lock_err("kv.seed"))?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let values = self.shared.values.read().map_err(|_| lock_err("kv.get"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        let mut values = self.shared.values.write().map_err(|_| lock_err("kv.set"))?;
        values.insert(key.to_string(), value.to_vec());
        self.shared.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        let mut values = self.shared.values.write().map_err(|_| lock_err("kv.remove"))?;
        values.remove(key);
        self.shared.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
