//! Platform-facing region descriptors and identifier namespacing.

use crate::geofence::{Coordinate, Geofence};

/// A circular region as handed to the platform monitor.
///
/// Equality is exact field equality; the reconciler relies on it to skip
/// regions that are already monitored as desired.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDescriptor {
    /// Platform identifier, e.g. `event:<geofence id>`.
    pub identifier: String,
    /// Region center.
    pub center: Coordinate,
    /// Radius in metres.
    pub radius: f64,
    /// Raise a callback on entry.
    pub notify_on_entry: bool,
    /// Raise a callback on exit.
    pub notify_on_exit: bool,
}

/// Maps geofence ids to platform identifiers and back.
///
/// Only identifiers carrying the prefix belong to this component; anything
/// else on the monitor is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNamespace {
    prefix: String,
}

impl Default for RegionNamespace {
    fn default() -> Self {
        Self::new("event:")
    }
}

impl RegionNamespace {
    /// A namespace owning identifiers that start with `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// The owned prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `event:` + `id`.
    #[must_use]
    pub fn identifier(&self, id: &str) -> String {
        format!("{}{id}", self.prefix)
    }

    /// The geofence id inside `identifier`, if it is ours.
    #[must_use]
    pub fn strip<'a>(&self, identifier: &'a str) -> Option<&'a str> {
        identifier.strip_prefix(self.prefix.as_str())
    }

    /// True when `identifier` belongs to this namespace.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        identifier.starts_with(self.prefix.as_str())
    }

    /// Desired platform state for `geofence`.
    #[must_use]
    pub fn descriptor(&self, geofence: &Geofence) -> RegionDescriptor {
        RegionDescriptor {
            identifier: self.identifier(&geofence.id),
            center: geofence.coordinate(),
            radius: geofence.radius,
            notify_on_entry: geofence.notify_on_enter,
            notify_on_exit: geofence.notify_on_exit,
        }
    }
}
