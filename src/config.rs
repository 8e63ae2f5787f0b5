//! Runtime configuration for the geofencing core.
//!
//! Hosts normally use [`GeofencingConfig::default`]. The struct also
//! deserializes from JSON with every field optional, so a partial document
//! such as `{"capacity": 10}` overrides only what it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for [`crate::GeofenceManager`] and [`crate::GeofencingService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofencingConfig {
    /// Maximum number of concurrently monitored regions.
    pub capacity: usize,
    /// Lower radius clamp (metres).
    pub min_radius: f64,
    /// Upper radius clamp (metres).
    pub max_radius: f64,
    /// Radius used by [`crate::GeofenceRequest`] when none is given (metres).
    pub default_radius: f64,
    /// Key under which the geofence mapping is persisted.
    pub store_key: String,
    /// Namespace prefix for platform region identifiers.
    pub region_prefix: String,
    /// Worker queue size. When full, caller commands block and platform
    /// events are dropped.
    pub queue_capacity: usize,
}

impl Default for GeofencingConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            min_radius: 50.0,
            max_radius: 2000.0,
            default_radius: 150.0,
            store_key: "geofencing.store.v1".to_string(),
            region_prefix: "event:".to_string(),
            queue_capacity: 1024,
        }
    }
}

impl GeofencingConfig {
    /// Checks internal consistency.
    ///
    /// A capacity of zero is accepted: it admits nothing and stops every
    /// namespaced region on the next pass.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.min_radius > 0.0 && self.min_radius <= self.max_radius) {
            return Err(ConfigError::InvalidRadiusBounds {
                min: self.min_radius,
                max: self.max_radius,
            });
        }

        if !(self.min_radius..=self.max_radius).contains(&self.default_radius) {
            return Err(ConfigError::DefaultRadiusOutOfBounds {
                value: self.default_radius,
                min: self.min_radius,
                max: self.max_radius,
            });
        }

        if self.store_key.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "store_key".to_string(),
            });
        }

        if self.region_prefix.is_empty() {
            return Err(ConfigError::EmptyField {
                field: "region_prefix".to_string(),
            });
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity {
                field: "queue_capacity".to_string(),
            });
        }

        Ok(self)
    }

    /// Radius clamp and default as one value.
    #[must_use]
    pub const fn radius_bounds(&self) -> RadiusBounds {
        RadiusBounds {
            min: self.min_radius,
            max: self.max_radius,
            default: self.default_radius,
        }
    }
}

/// Radius clamp applied on every upsert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusBounds {
    /// Lower bound (metres).
    pub min: f64,
    /// Upper bound (metres).
    pub max: f64,
    /// Used when a request carries no radius.
    pub default: f64,
}

impl Default for RadiusBounds {
    fn default() -> Self {
        GeofencingConfig::default().radius_bounds()
    }
}

impl RadiusBounds {
    /// Clamps `radius` into `[min, max]`, substituting the default when absent.
    ///
    /// NaN maps to `min`.
    #[must_use]
    pub fn resolve(&self, radius: Option<f64>) -> f64 {
        let radius = radius.unwrap_or(self.default);
        if radius.is_nan() {
            return self.min;
        }
        radius.clamp(self.min, self.max)
    }
}
