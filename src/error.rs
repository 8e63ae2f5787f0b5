//! Error types for the geofencing core.
//!
//! Nothing here reaches callers of `upsert`/`remove`: every failure mode of the
//! component is absorbed and logged. These types exist so that backends and
//! platform capabilities can report what went wrong, and so that construction
//! (config validation, opening a durable store) can fail loudly.

use thiserror::Error;

/// Errors raised by a key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes failed integrity checks.
    #[error("Corrupted value for key '{key}': {reason}")]
    Corrupted {
        /// Key whose value is damaged.
        key: String,
        /// What the check found.
        reason: String,
    },

    /// Another process holds the store.
    #[error("Store at {path} is locked by another process")]
    Locked {
        /// Store directory.
        path: String,
    },

    /// Encoding or decoding the geofence mapping failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A platform capability rejected a call.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The monitor refused to start or stop a region.
    #[error("Region monitoring rejected '{identifier}': {reason}")]
    MonitoringRejected {
        /// Region identifier.
        identifier: String,
        /// Platform-supplied reason.
        reason: String,
    },

    /// The notification center refused a post.
    #[error("Notification '{id}' could not be posted: {reason}")]
    NotificationRejected {
        /// Notification id.
        id: String,
        /// Platform-supplied reason.
        reason: String,
    },

    /// The capability does not exist on this device.
    #[error("Platform capability unavailable: {0}")]
    Unavailable(String),
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `min_radius` is not positive or exceeds `max_radius`.
    #[error("Radius bounds are invalid: min {min} must be positive and not exceed max {max}")]
    InvalidRadiusBounds {
        /// Configured lower bound.
        min: f64,
        /// Configured upper bound.
        max: f64,
    },

    /// `default_radius` falls outside the bounds.
    #[error("Default radius {value} lies outside [{min}, {max}]")]
    DefaultRadiusOutOfBounds {
        /// Configured default.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A required string is empty.
    #[error("Field '{field}' cannot be empty")]
    EmptyField {
        /// Field name.
        field: String,
    },

    /// A queue depth is zero.
    #[error("Queue capacity '{field}' must be at least 1")]
    ZeroQueueCapacity {
        /// Field name.
        field: String,
    },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum GeofenceError {
    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Platform capability failure.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Rejected configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Anything else, e.g. the worker thread could not start.
    #[error("Internal error: {message}")]
    Internal {
        /// Description.
        message: String,
    },
}

impl GeofenceError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for geofencing operations.
pub type GeofenceResult<T> = Result<T, GeofenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupted_message_names_key() {
        let err = StorageError::Corrupted {
            key: "geofencing.store.v1".to_string(),
            reason: "CRC mismatch".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("geofencing.store.v1"));
        assert!(msg.contains("CRC mismatch"));
    }

    #[test]
    fn test_config_error_radius_bounds() {
        let err = ConfigError::InvalidRadiusBounds { min: 500.0, max: 100.0 };
        let msg = format!("{err}");
        assert!(msg.contains("500"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_geofence_error_from_storage() {
        let err: GeofenceError = StorageError::Backend("disk full".to_string()).into();
        assert!(err.is_storage());
        assert!(!err.is_config());
        assert!(format!("{err}").contains("disk full"));
    }

    #[test]
    fn test_geofence_error_from_config() {
        let err: GeofenceError = ConfigError::EmptyField {
            field: "store_key".to_string(),
        }
        .into();
        assert!(err.is_config());
    }

    #[test]
    fn test_geofence_error_internal() {
        let err = GeofenceError::internal("worker gone");
        assert!(format!("{err}").contains("worker gone"));
    }
}
