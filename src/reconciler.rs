//! Incremental sync between the admitted set and the platform monitor.
//!
//! A pass stops namespaced regions that are no longer admitted, leaves
//! identical regions alone (a stop/start pair would open a monitoring gap),
//! and replaces or starts everything else. Calls are fire-and-forget: a
//! rejected start or stop is logged and left for the next pass.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::permission::LocationAuthorization;
use crate::platform::{LocationAuthorizer, RegionMonitor};
use crate::region::{RegionDescriptor, RegionNamespace};
use crate::scheduler;
use crate::store::GeofenceStore;

/// Why a pass did or did not touch the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The diff was computed and applied.
    Applied,
    /// Region monitoring is not available on this device.
    SkippedUnavailable,
    /// Location authorization is below when-in-use.
    SkippedUnauthorized(LocationAuthorization),
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Whether the diff ran at all.
    pub outcome: ReconcileOutcome,
    /// Identifiers passed to `start`, in admission order.
    pub started: Vec<String>,
    /// Identifiers passed to `stop`.
    pub stopped: Vec<String>,
    /// Admitted regions already monitored as desired.
    pub unchanged: usize,
}

impl ReconcileReport {
    fn skipped(outcome: ReconcileOutcome) -> Self {
        Self {
            outcome,
            started: Vec::new(),
            stopped: Vec::new(),
            unchanged: 0,
        }
    }

    /// Number of platform calls issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.started.len() + self.stopped.len()
    }
}

/// Applies the scheduler's choice to a [`RegionMonitor`].
#[derive(Debug, Clone)]
pub struct RegionReconciler {
    namespace: RegionNamespace,
    capacity: usize,
}

impl Default for RegionReconciler {
    fn default() -> Self {
        Self::new(RegionNamespace::default(), 20)
    }
}

impl RegionReconciler {
    /// A reconciler owning regions under `namespace`, admitting at most `capacity`.
    #[must_use]
    pub const fn new(namespace: RegionNamespace, capacity: usize) -> Self {
        Self { namespace, capacity }
    }

    /// Maximum number of admitted regions.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Runs one pass.
    ///
    /// Guarded: when monitoring is unavailable or location authorization is
    /// below when-in-use, nothing is read or changed on the monitor.
    pub fn reconcile(
        &self,
        store: &GeofenceStore,
        now: DateTime<Utc>,
        monitor: &dyn RegionMonitor,
        location: &dyn LocationAuthorizer,
    ) -> ReconcileReport {
        if !monitor.is_available() {
            debug!("region monitoring unavailable, skipping reconciliation");
            return ReconcileReport::skipped(ReconcileOutcome::SkippedUnavailable);
        }

        let status = location.status();
        if !status.allows_monitoring() {
            debug!(?status, "location not authorized, skipping reconciliation");
            return ReconcileReport::skipped(ReconcileOutcome::SkippedUnauthorized(status));
        }

        let chosen = scheduler::select(store.iter(), now, self.capacity);
        let chosen_ids: HashSet<&str> = chosen.iter().map(|g| g.id.as_str()).collect();

        let existing: HashMap<String, RegionDescriptor> = monitor
            .monitored()
            .into_iter()
            .filter(|r| self.namespace.contains(&r.identifier))
            .map(|r| (r.identifier.clone(), r))
            .collect();

        let mut report = ReconcileReport::skipped(ReconcileOutcome::Applied);

        let mut evicted: Vec<&String> = existing
            .keys()
            .filter(|ident| {
                self.namespace
                    .strip(ident)
                    .map_or(false, |id| !chosen_ids.contains(id))
            })
            .collect();
        evicted.sort();

        for identifier in evicted {
            self.stop(monitor, identifier);
            report.stopped.push(identifier.clone());
        }

        for geofence in chosen {
            let target = self.namespace.descriptor(geofence);
            match existing.get(&target.identifier) {
                Some(current) if *current == target => {
                    report.unchanged += 1;
                }
                Some(_) => {
                    self.stop(monitor, &target.identifier);
                    report.stopped.push(target.identifier.clone());
                    self.start(monitor, &target);
                    report.started.push(target.identifier);
                }
                None => {
                    self.start(monitor, &target);
                    report.started.push(target.identifier);
                }
            }
        }

        debug!(
            admitted = chosen_ids.len(),
            total = store.len(),
            started = report.started.len(),
            stopped = report.stopped.len(),
            unchanged = report.unchanged,
            "reconciled monitored regions"
        );

        report
    }

    fn start(&self, monitor: &dyn RegionMonitor, region: &RegionDescriptor) {
        if let Err(e) = monitor.start(region) {
            debug!(identifier = %region.identifier, error = %e, "region start rejected");
        }
    }

    fn stop(&self, monitor: &dyn RegionMonitor, identifier: &str) {
        if let Err(e) = monitor.stop(identifier) {
            debug!(identifier, error = %e, "region stop rejected");
        }
    }
}
