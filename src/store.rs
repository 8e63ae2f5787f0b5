//! The durable id → geofence mapping.
//!
//! The whole mapping is serialized as one JSON object under a single key and
//! rewritten after every mutation. Loading is best-effort: a missing,
//! unreadable or unparseable value yields an empty store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::RadiusBounds;
use crate::error::StorageError;
use crate::geofence::{Geofence, GeofenceRequest};
use crate::storage::KeyValueStore;

/// Owner of the persisted geofence mapping.
pub struct GeofenceStore {
    geofences: BTreeMap<String, Geofence>,
    backend: Arc<dyn KeyValueStore>,
    key: String,
    radius: RadiusBounds,
}

impl std::fmt::Debug for GeofenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeofenceStore")
            .field("key", &self.key)
            .field("len", &self.geofences.len())
            .finish_non_exhaustive()
    }
}

impl GeofenceStore {
    /// Loads the mapping stored under `key`.
    ///
    /// Never fails: any read or decode problem is logged and replaced with an
    /// empty mapping.
    pub fn load(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let geofences = match backend.get(&key) {
            Ok(Some(bytes)) => match serde_json::from_slice::<BTreeMap<String, Geofence>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding unparseable geofence store");
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "geofence store unreadable, starting empty");
                BTreeMap::new()
            }
        };

        debug!(key = %key, count = geofences.len(), "loaded geofence store");

        Self {
            geofences,
            backend,
            key,
            radius: RadiusBounds::default(),
        }
    }

    /// Overrides the radius clamp and default.
    #[must_use]
    pub fn with_radius_bounds(mut self, radius: RadiusBounds) -> Self {
        self.radius = radius;
        self
    }

    /// Creates or overwrites the geofence named by `request.id`.
    ///
    /// `created_at` survives an overwrite; `last_updated_at` is always `now`.
    /// A request with a non-finite coordinate is rejected and leaves the
    /// store untouched: JSON cannot represent it, so persisting it would make
    /// the whole blob unreadable.
    pub fn upsert(&mut self, request: GeofenceRequest, now: DateTime<Utc>) -> Option<&Geofence> {
        if !request.coordinate.is_finite() {
            warn!(
                id = %request.id,
                latitude = request.coordinate.latitude,
                longitude = request.coordinate.longitude,
                "rejecting geofence with non-finite coordinate"
            );
            return None;
        }

        let radius = self.radius.resolve(request.radius);
        let created_at = self
            .geofences
            .get(&request.id)
            .map_or(now, |existing| existing.created_at);

        let id = request.id;
        let geofence = Geofence {
            id: id.clone(),
            title: request.title,
            latitude: request.coordinate.latitude,
            longitude: request.coordinate.longitude,
            radius,
            notify_on_enter: request.proximity.enter,
            notify_on_exit: request.proximity.exit,
            start_date: request.start_date,
            end_date: request.end_date,
            created_at,
            last_updated_at: now,
        };

        self.geofences.insert(id.clone(), geofence);
        self.persist();
        self.geofences.get(&id)
    }

    /// Deletes `id`. Returns whether anything was removed; an absent id is a
    /// no-op and does not touch the backend.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.geofences.remove(id).is_none() {
            return false;
        }
        self.persist();
        true
    }

    /// Looks up a geofence.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Geofence> {
        self.geofences.get(id)
    }

    /// Number of stored geofences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.geofences.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geofences.is_empty()
    }

    /// Iterates geofences in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Geofence> {
        self.geofences.values()
    }

    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            warn!(key = %self.key, error = %e, "failed to persist geofence store");
        }
    }

    fn try_persist(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(&self.geofences)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(&self.key, &bytes)
    }
}
