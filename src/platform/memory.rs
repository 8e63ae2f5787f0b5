//! Recording in-memory platform fakes.
//!
//! Each fake keeps a log of the calls it received so tests can assert on
//! exactly what the component asked the platform to do, including asserting
//! that it asked for nothing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::PlatformError;
use crate::notify::NotificationRequest;
use crate::permission::{LocationAuthorization, NotificationOptions, PermissionState};
use crate::region::RegionDescriptor;

use super::{LocationAuthorizer, NotificationCenter, RegionMonitor};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A call received by [`InMemoryRegionMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCall {
    /// `start` with the requested region.
    Start(RegionDescriptor),
    /// `stop` with the identifier.
    Stop(String),
}

impl MonitorCall {
    /// Identifier the call refers to.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Start(region) => &region.identifier,
            Self::Stop(identifier) => identifier,
        }
    }
}

/// Region monitor with a hard capacity, like the real one.
///
/// `start` beyond capacity is rejected and recorded; the region is not added.
#[derive(Debug)]
pub struct InMemoryRegionMonitor {
    regions: Mutex<BTreeMap<String, RegionDescriptor>>,
    calls: Mutex<Vec<MonitorCall>>,
    available: AtomicBool,
    capacity: usize,
}

impl Default for InMemoryRegionMonitor {
    fn default() -> Self {
        Self::with_capacity(20)
    }
}

impl InMemoryRegionMonitor {
    /// A monitor with room for 20 regions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A monitor that rejects starts beyond `capacity` regions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            regions: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            capacity,
        }
    }

    /// Toggle whether monitoring is supported.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Install a region without recording a call, as if left over from an
    /// earlier session or registered by another component.
    pub fn preload(&self, region: RegionDescriptor) {
        locked(&self.regions).insert(region.identifier.clone(), region);
    }

    /// Identifiers currently monitored, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        locked(&self.regions).keys().cloned().collect()
    }

    /// The monitored region named `identifier`.
    #[must_use]
    pub fn region(&self, identifier: &str) -> Option<RegionDescriptor> {
        locked(&self.regions).get(identifier).cloned()
    }

    /// Every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<MonitorCall> {
        locked(&self.calls).clone()
    }

    /// Drains the call log.
    pub fn take_calls(&self) -> Vec<MonitorCall> {
        std::mem::take(&mut *locked(&self.calls))
    }
}

impl RegionMonitor for InMemoryRegionMonitor {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn monitored(&self) -> Vec<RegionDescriptor> {
        locked(&self.regions).values().cloned().collect()
    }

    fn start(&self, region: &RegionDescriptor) -> Result<(), PlatformError> {
        locked(&self.calls).push(MonitorCall::Start(region.clone()));

        let mut regions = locked(&self.regions);
        if !regions.contains_key(&region.identifier) && regions.len() >= self.capacity {
            return Err(PlatformError::MonitoringRejected {
                identifier: region.identifier.clone(),
                reason: format!("monitor capacity {} reached", self.capacity),
            });
        }
        regions.insert(region.identifier.clone(), region.clone());
        Ok(())
    }

    fn stop(&self, identifier: &str) -> Result<(), PlatformError> {
        locked(&self.calls).push(MonitorCall::Stop(identifier.to_string()));
        locked(&self.regions).remove(identifier);
        Ok(())
    }
}

/// A prompt issued to [`InMemoryLocationAuthorizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRequest {
    /// `request_when_in_use` was called.
    WhenInUse,
    /// `request_always` was called.
    Always,
}

/// Location authorization whose status only changes when a test says so.
///
/// Prompts are recorded and otherwise ignored, modelling a user who has not
/// answered (yet).
#[derive(Debug)]
pub struct InMemoryLocationAuthorizer {
    status: Mutex<LocationAuthorization>,
    requests: Mutex<Vec<LocationRequest>>,
}

impl InMemoryLocationAuthorizer {
    /// An authorizer reporting `status`.
    #[must_use]
    pub const fn new(status: LocationAuthorization) -> Self {
        Self {
            status: Mutex::new(status),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Simulates the user (or system settings) changing the answer.
    pub fn set_status(&self, status: LocationAuthorization) {
        *locked(&self.status) = status;
    }

    /// Prompts issued so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<LocationRequest> {
        locked(&self.requests).clone()
    }
}

impl LocationAuthorizer for InMemoryLocationAuthorizer {
    fn status(&self) -> LocationAuthorization {
        *locked(&self.status)
    }

    fn request_when_in_use(&self) {
        locked(&self.requests).push(LocationRequest::WhenInUse);
    }

    fn request_always(&self) {
        locked(&self.requests).push(LocationRequest::Always);
    }
}

/// Notification center that records prompts and posts.
///
/// Posting succeeds regardless of authorization, as on the real platform
/// where an unauthorized post is silently dropped by the OS rather than the
/// caller. Use [`reject_posts`](Self::reject_posts) to simulate failures.
#[derive(Debug)]
pub struct InMemoryNotificationCenter {
    state: Mutex<PermissionState>,
    authorization_requests: Mutex<Vec<NotificationOptions>>,
    posted: Mutex<Vec<NotificationRequest>>,
    reject: AtomicBool,
}

impl InMemoryNotificationCenter {
    /// A center reporting `state`.
    #[must_use]
    pub const fn new(state: PermissionState) -> Self {
        Self {
            state: Mutex::new(state),
            authorization_requests: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
        }
    }

    /// Changes the reported authorization.
    pub fn set_authorization(&self, state: PermissionState) {
        *locked(&self.state) = state;
    }

    /// Makes every later post fail.
    pub fn reject_posts(&self, reject: bool) {
        self.reject.store(reject, Ordering::Relaxed);
    }

    /// Authorization prompts issued so far.
    #[must_use]
    pub fn authorization_requests(&self) -> Vec<NotificationOptions> {
        locked(&self.authorization_requests).clone()
    }

    /// Notifications accepted so far.
    #[must_use]
    pub fn posted(&self) -> Vec<NotificationRequest> {
        locked(&self.posted).clone()
    }
}

impl NotificationCenter for InMemoryNotificationCenter {
    fn authorization(&self) -> PermissionState {
        *locked(&self.state)
    }

    fn request_authorization(&self, options: NotificationOptions) {
        locked(&self.authorization_requests).push(options);
    }

    fn post(&self, request: &NotificationRequest) -> Result<(), PlatformError> {
        if self.reject.load(Ordering::Relaxed) {
            return Err(PlatformError::NotificationRejected {
                id: request.id.clone(),
                reason: "rejected by test center".to_string(),
            });
        }
        locked(&self.posted).push(request.clone());
        Ok(())
    }
}
