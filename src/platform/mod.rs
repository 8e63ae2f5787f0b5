//! Platform capabilities.
//!
//! The OS region monitor, location authorization and notification center are
//! reached only through these traits. A host adapter implements them over the
//! real platform APIs; [`memory`] provides recording fakes for tests and
//! simulators.
//!
//! All three are called from the manager's serial context only.

pub mod memory;

pub use memory::{
    InMemoryLocationAuthorizer, InMemoryNotificationCenter, InMemoryRegionMonitor, LocationRequest,
    MonitorCall,
};

use crate::error::PlatformError;
use crate::notify::NotificationRequest;
use crate::permission::{LocationAuthorization, NotificationOptions, PermissionState};
use crate::region::RegionDescriptor;

/// The scarce resource: circular regions the OS watches on our behalf.
pub trait RegionMonitor: Send + Sync {
    /// Whether circular region monitoring exists on this device at all.
    fn is_available(&self) -> bool;

    /// Every region currently monitored for this process, ours or not.
    fn monitored(&self) -> Vec<RegionDescriptor>;

    /// Begin monitoring `region`, replacing any region with the same identifier.
    ///
    /// An `Ok` only means the request was accepted for submission.
    fn start(&self, region: &RegionDescriptor) -> Result<(), PlatformError>;

    /// Stop monitoring `identifier`. Unknown identifiers are not an error.
    fn stop(&self, identifier: &str) -> Result<(), PlatformError>;
}

/// Location permission.
pub trait LocationAuthorizer: Send + Sync {
    /// Current status.
    fn status(&self) -> LocationAuthorization;

    /// Prompt for when-in-use. Must return without waiting for the user.
    fn request_when_in_use(&self);

    /// Prompt for always. Must return without waiting for the user.
    fn request_always(&self);
}

/// Local notifications.
pub trait NotificationCenter: Send + Sync {
    /// Current notification authorization.
    fn authorization(&self) -> PermissionState;

    /// Prompt for authorization. Must return without waiting for the user.
    fn request_authorization(&self, options: NotificationOptions);

    /// Deliver `request` now.
    fn post(&self, request: &NotificationRequest) -> Result<(), PlatformError>;
}

/// The three capabilities a manager needs, bundled for construction.
#[derive(Clone)]
pub struct Platform {
    /// Region monitoring.
    pub monitor: std::sync::Arc<dyn RegionMonitor>,
    /// Location permission.
    pub location: std::sync::Arc<dyn LocationAuthorizer>,
    /// Local notifications.
    pub notifications: std::sync::Arc<dyn NotificationCenter>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
