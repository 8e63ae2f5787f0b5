//! Authorization states and the gate that requests them.
//!
//! Requests never wait for the user. The gate fires the platform request and
//! returns; when the user eventually answers, the platform reports an
//! authorization change and the manager reconciles again.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::platform::{LocationAuthorizer, NotificationCenter};

/// Decided-or-not state of one permission kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// The user has not been asked yet.
    Unknown,
    /// Allowed.
    Granted,
    /// The user said no. Only system settings can change it.
    Denied,
    /// Policy forbids it (parental controls, MDM).
    Restricted,
}

impl PermissionState {
    /// True for `Denied` and `Restricted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

/// Location authorization, which unlike notifications has two grant levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAuthorization {
    /// Never asked.
    NotDetermined,
    /// Foreground grant. Enough to register regions.
    WhenInUse,
    /// Background grant.
    Always,
    /// Refused by the user.
    Denied,
    /// Refused by policy.
    Restricted,
}

impl LocationAuthorization {
    /// Projection onto the generic permission state.
    #[must_use]
    pub const fn permission_state(self) -> PermissionState {
        match self {
            Self::NotDetermined => PermissionState::Unknown,
            Self::WhenInUse | Self::Always => PermissionState::Granted,
            Self::Denied => PermissionState::Denied,
            Self::Restricted => PermissionState::Restricted,
        }
    }

    /// At least when-in-use.
    #[must_use]
    pub const fn allows_monitoring(self) -> bool {
        matches!(self, Self::WhenInUse | Self::Always)
    }
}

/// Presentation options requested with notification authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationOptions {
    /// Show banners.
    pub alert: bool,
    /// Play sounds.
    pub sound: bool,
    /// Badge the app icon.
    pub badge: bool,
}

impl NotificationOptions {
    /// Alert, sound and badge.
    pub const ALL: Self = Self {
        alert: true,
        sound: true,
        badge: true,
    };
}

/// Requests issued by one [`PermissionGate::ensure`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateDecision {
    /// Notification authorization was requested.
    pub requested_notifications: bool,
    /// When-in-use location was requested.
    pub requested_when_in_use: bool,
    /// The escalation to always was requested.
    pub requested_always: bool,
}

impl GateDecision {
    /// True when no request was issued.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !(self.requested_notifications || self.requested_when_in_use || self.requested_always)
    }
}

/// Issues permission requests ahead of reconciliation.
#[derive(Debug, Default)]
pub struct PermissionGate {
    always_requested: bool,
}

impl PermissionGate {
    /// A gate that has not yet asked for the always escalation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notification authorization: ask once, while undetermined.
    pub fn ensure_notifications(&self, center: &dyn NotificationCenter) -> bool {
        if center.authorization() != PermissionState::Unknown {
            return false;
        }
        debug!("requesting notification authorization");
        center.request_authorization(NotificationOptions::ALL);
        true
    }

    /// Location authorization.
    ///
    /// Undetermined asks for when-in-use. A when-in-use grant is escalated to
    /// always, at most once per gate. Always, denied and restricted are left
    /// alone.
    pub fn ensure_location(&mut self, location: &dyn LocationAuthorizer) -> (bool, bool) {
        match location.status() {
            LocationAuthorization::NotDetermined => {
                debug!("requesting when-in-use location authorization");
                location.request_when_in_use();
                (true, false)
            }
            LocationAuthorization::WhenInUse if !self.always_requested => {
                debug!("escalating location authorization to always");
                self.always_requested = true;
                location.request_always();
                (false, true)
            }
            LocationAuthorization::WhenInUse
            | LocationAuthorization::Always
            | LocationAuthorization::Denied
            | LocationAuthorization::Restricted => (false, false),
        }
    }

    /// Runs both checks. Never blocks on the user.
    pub fn ensure(
        &mut self,
        center: &dyn NotificationCenter,
        location: &dyn LocationAuthorizer,
    ) -> GateDecision {
        let requested_notifications = self.ensure_notifications(center);
        let (requested_when_in_use, requested_always) = self.ensure_location(location);
        GateDecision {
            requested_notifications,
            requested_when_in_use,
            requested_always,
        }
    }
}
