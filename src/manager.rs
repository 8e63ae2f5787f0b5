//! The geofencing core as one explicitly owned object.
//!
//! `GeofenceManager` owns the store and the platform handles and runs every
//! operation to completion on the caller's thread. It is not `Sync`-shared:
//! whoever owns it is the serial context. [`crate::GeofencingService`] wraps
//! it in a worker thread for hosts that need a cloneable handle.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::GeofencingConfig;
use crate::error::GeofenceResult;
use crate::geofence::GeofenceRequest;
use crate::notify::{Crossing, NotificationEmitter, NotificationRequest};
use crate::permission::{GateDecision, PermissionGate};
use crate::platform::Platform;
use crate::reconciler::{ReconcileReport, RegionReconciler};
use crate::region::RegionNamespace;
use crate::scheduler;
use crate::storage::KeyValueStore;
use crate::store::GeofenceStore;
use crate::time::Clock;

/// Store, gate, scheduler, reconciler and emitter wired together.
pub struct GeofenceManager {
    config: GeofencingConfig,
    store: GeofenceStore,
    gate: PermissionGate,
    reconciler: RegionReconciler,
    emitter: NotificationEmitter,
    platform: Platform,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GeofenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeofenceManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl GeofenceManager {
    /// Validates `config` and loads the persisted mapping.
    ///
    /// Does not touch the platform; call [`start`](Self::start) once the host
    /// is ready for the initial sync.
    pub fn new(
        config: GeofencingConfig,
        backend: Arc<dyn KeyValueStore>,
        platform: Platform,
        clock: Arc<dyn Clock>,
    ) -> GeofenceResult<Self> {
        let config = config.validate()?;
        let namespace = RegionNamespace::new(config.region_prefix.clone());

        let store = GeofenceStore::load(backend, config.store_key.clone())
            .with_radius_bounds(config.radius_bounds());

        info!(
            geofences = store.len(),
            capacity = config.capacity,
            "geofence manager loaded"
        );

        Ok(Self {
            reconciler: RegionReconciler::new(namespace.clone(), config.capacity),
            emitter: NotificationEmitter::new(namespace),
            gate: PermissionGate::new(),
            store,
            platform,
            clock,
            config,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &GeofencingConfig {
        &self.config
    }

    /// Read-only view of the mapping.
    #[must_use]
    pub const fn store(&self) -> &GeofenceStore {
        &self.store
    }

    /// Ids the scheduler admits right now, best first.
    #[must_use]
    pub fn admitted(&self) -> Vec<String> {
        scheduler::admitted(&self.store, self.clock.now(), self.config.capacity)
    }

    /// Initial sync after load.
    ///
    /// Permission prompts are skipped while the store is empty so that an
    /// idle install never prompts; stale regions from an earlier session are
    /// still cleaned up if authorization allows.
    pub fn start(&mut self) -> ReconcileReport {
        if self.store.is_empty() {
            return self.reconcile("start");
        }
        self.sync("start")
    }

    /// Create or update a geofence, then sync.
    pub fn upsert(&mut self, request: GeofenceRequest) -> ReconcileReport {
        let now = self.clock.now();
        if let Some(geofence) = self.store.upsert(request, now) {
            debug!(id = %geofence.id, radius = geofence.radius, "upserted geofence");
        }
        self.sync("upsert")
    }

    /// Delete a geofence (absent ids are fine), then sync.
    pub fn remove(&mut self, id: &str) -> ReconcileReport {
        if self.store.remove(id) {
            debug!(id, "removed geofence");
        }
        self.sync("remove")
    }

    /// The platform reported a change to location or notification authorization.
    pub fn authorization_changed(&mut self) -> ReconcileReport {
        self.sync("authorization_changed")
    }

    /// Re-rank against the current time without any mutation.
    ///
    /// Hosts call this when time has moved enough to matter, e.g. on
    /// foregrounding, so that upcoming geofences get admitted.
    pub fn refresh(&mut self) -> ReconcileReport {
        self.sync("refresh")
    }

    /// A monitored region was entered or exited.
    pub fn region_crossed(&self, identifier: &str, crossing: Crossing) -> Option<NotificationRequest> {
        self.emitter.handle(
            &self.store,
            self.platform.notifications.as_ref(),
            identifier,
            crossing,
        )
    }

    fn ensure_permissions(&mut self) -> GateDecision {
        self.gate.ensure(
            self.platform.notifications.as_ref(),
            self.platform.location.as_ref(),
        )
    }

    fn sync(&mut self, trigger: &'static str) -> ReconcileReport {
        let decision = self.ensure_permissions();
        if !decision.is_noop() {
            debug!(trigger, ?decision, "permission requests issued");
        }
        self.reconcile(trigger)
    }

    fn reconcile(&self, trigger: &'static str) -> ReconcileReport {
        let report = self.reconciler.reconcile(
            &self.store,
            self.clock.now(),
            self.platform.monitor.as_ref(),
            self.platform.location.as_ref(),
        );
        debug!(trigger, outcome = ?report.outcome, calls = report.call_count(), "sync finished");
        report
    }
}
