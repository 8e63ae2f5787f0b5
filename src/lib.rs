//! # geofencing - capacity-bounded geofence scheduling
//!
//! Keeps a persistent set of event-linked geofences and continuously
//! reconciles it against a platform region monitor that can only watch a
//! fixed number of regions (20 by default).
//!
//! ## Core Concepts
//!
//! - **GeofenceStore**: durable id → geofence mapping, one JSON blob under one key
//! - **Scheduler**: pure admission by [`Priority`] (upcoming, ending soon, indefinite)
//! - **RegionReconciler**: minimal start/stop diff against the live monitor
//! - **PermissionGate**: non-blocking authorization prompts before each sync
//! - **NotificationEmitter**: local notifications on region enter/exit
//!
//! [`GeofenceManager`] wires these together on the caller's thread;
//! [`GeofencingService`] runs the same manager on a dedicated serial worker.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use geofencing::{Coordinate, GeofenceRequest, GeofencingConfig, GeofencingService, Platform, SystemClock};
//!
//! let kv = geofencing::storage::open_store("./geofences", None)?;
//! let service = GeofencingService::spawn(
//!     GeofencingConfig::default(),
//!     Arc::new(kv),
//!     Platform { monitor, location, notifications },
//!     Arc::new(SystemClock),
//! )?;
//!
//! service.upsert(
//!     GeofenceRequest::new("evt-42", "Dentist", Coordinate::new(51.50, -0.12))
//!         .radius(300.0)
//!         .starts_at(appointment),
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod geofence;
pub mod manager;
pub mod notify;
pub mod permission;
pub mod platform;
pub mod reconciler;
pub mod region;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod store;
pub mod time;

// Re-export primary types at crate root for convenience
pub use config::{GeofencingConfig, RadiusBounds};
pub use error::{ConfigError, GeofenceError, GeofenceResult, PlatformError, StorageError};
pub use geofence::{Coordinate, Geofence, GeofenceRequest, Proximity};
pub use manager::GeofenceManager;
pub use notify::{Crossing, NotificationEmitter, NotificationRequest};
pub use permission::{LocationAuthorization, NotificationOptions, PermissionGate, PermissionState};
pub use platform::{LocationAuthorizer, NotificationCenter, Platform, RegionMonitor};
pub use reconciler::{ReconcileOutcome, ReconcileReport, RegionReconciler};
pub use region::{RegionDescriptor, RegionNamespace};
pub use scheduler::Priority;
pub use service::{GeofencingService, PlatformEventSink};
pub use storage::{InMemoryKeyValueStore, KeyValueStore};
pub use store::GeofenceStore;
pub use time::{Clock, ManualClock, SystemClock};
