//! Durable key-value storage for the geofence mapping.
//!
//! [`KeyValueStore`] is the seam; [`InMemoryKeyValueStore`] backs tests and
//! embedded use, and [`persistent::FileKeyValueStore`] (feature `persistent`)
//! keeps values on disk across restarts.

mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use memory::InMemoryKeyValueStore;
pub use traits::KeyValueStore;

#[cfg(feature = "persistent")]
pub use persistent::{open_store, FileKeyValueStore, PersistentConfig};
