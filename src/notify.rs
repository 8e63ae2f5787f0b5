//! Local notifications for region crossings.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::platform::NotificationCenter;
use crate::region::RegionNamespace;
use crate::store::GeofenceStore;

/// Which boundary was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crossing {
    /// The device moved inside the region.
    Enter,
    /// The device moved outside the region.
    Exit,
}

/// A local notification to post immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// `geofence:<id>:<uuid>`; unique per post.
    pub id: String,
    /// "Arrived at X" or "Leaving X".
    pub title: String,
    /// Full sentence shown under the title.
    pub body: String,
    /// Play the default sound.
    pub sound: bool,
}

/// Turns region callbacks into notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationEmitter {
    namespace: RegionNamespace,
}

impl NotificationEmitter {
    /// An emitter resolving identifiers under `namespace`.
    #[must_use]
    pub const fn new(namespace: RegionNamespace) -> Self {
        Self { namespace }
    }

    /// Builds the notification for a crossing, if one is due.
    ///
    /// Returns `None` for foreign identifiers, unknown ids, and geofences that
    /// opted out of this crossing.
    #[must_use]
    pub fn compose(
        &self,
        store: &GeofenceStore,
        identifier: &str,
        crossing: Crossing,
    ) -> Option<NotificationRequest> {
        let id = self.namespace.strip(identifier)?;
        let geofence = store.get(id)?;

        let (title, body) = match crossing {
            Crossing::Enter if geofence.notify_on_enter => (
                format!("Arrived at {}", geofence.title),
                format!("You\u{2019}ve arrived at {}.", geofence.title),
            ),
            Crossing::Exit if geofence.notify_on_exit => (
                format!("Leaving {}", geofence.title),
                format!("You\u{2019}re leaving {}.", geofence.title),
            ),
            Crossing::Enter | Crossing::Exit => return None,
        };

        Some(NotificationRequest {
            id: format!("geofence:{id}:{}", Uuid::new_v4()),
            title,
            body,
            sound: true,
        })
    }

    /// Composes and posts. Post failures are logged, never returned.
    pub fn handle(
        &self,
        store: &GeofenceStore,
        center: &dyn NotificationCenter,
        identifier: &str,
        crossing: Crossing,
    ) -> Option<NotificationRequest> {
        let Some(request) = self.compose(store, identifier, crossing) else {
            debug!(identifier, ?crossing, "region crossing produced no notification");
            return None;
        };

        if let Err(e) = center.post(&request) {
            warn!(identifier, error = %e, "failed to post geofence notification");
        }
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::geofence::{Coordinate, GeofenceRequest, Proximity};
    use crate::permission::PermissionState;
    use crate::platform::InMemoryNotificationCenter;
    use crate::storage::InMemoryKeyValueStore;

    fn store_with(id: &str, title: &str, proximity: Proximity) -> GeofenceStore {
        let mut store = GeofenceStore::load(Arc::new(InMemoryKeyValueStore::new()), "k");
        store.upsert(
            GeofenceRequest::new(id, title, Coordinate::new(0.0, 0.0)).proximity(proximity),
            Utc::now(),
        );
        store
    }

    #[test]
    fn test_enter_posts_arrival() {
        let store = store_with("e1", "Office", Proximity::ENTER);
        let center = InMemoryNotificationCenter::new(PermissionState::Granted);
        let emitter = NotificationEmitter::default();

        let req = emitter.handle(&store, &center, "event:e1", Crossing::Enter).unwrap();
        assert_eq!(req.title, "Arrived at Office");
        assert!(req.body.contains("arrived at Office"));
        assert!(req.id.starts_with("geofence:e1:"));
        assert_eq!(center.posted(), vec![req]);
    }

    #[test]
    fn test_exit_posts_leaving() {
        let store = store_with("e1", "Gym", Proximity::BOTH);
        let req = NotificationEmitter::default()
            .compose(&store, "event:e1", Crossing::Exit)
            .unwrap();
        assert_eq!(req.title, "Leaving Gym");
    }

    #[test]
    fn test_opted_out_crossing_is_silent() {
        let store = store_with("e1", "Gym", Proximity::ENTER);
        assert!(NotificationEmitter::default()
            .compose(&store, "event:e1", Crossing::Exit)
            .is_none());
    }

    #[test]
    fn test_unknown_id_posts_nothing() {
        let store = store_with("e1", "Gym", Proximity::BOTH);
        let center = InMemoryNotificationCenter::new(PermissionState::Granted);
        let out = NotificationEmitter::default().handle(&store, &center, "event:gone", Crossing::Enter);
        assert!(out.is_none());
        assert!(center.posted().is_empty());
    }

    #[test]
    fn test_foreign_identifier_ignored() {
        let store = store_with("e1", "Gym", Proximity::BOTH);
        assert!(NotificationEmitter::default()
            .compose(&store, "e1", Crossing::Enter)
            .is_none());
    }

    #[test]
    fn test_ids_are_unique_per_post() {
        let store = store_with("e1", "Gym", Proximity::ENTER);
        let emitter = NotificationEmitter::default();
        let a = emitter.compose(&store, "event:e1", Crossing::Enter).unwrap();
        let b = emitter.compose(&store, "event:e1", Crossing::Enter).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_post_failure_is_swallowed() {
        let store = store_with("e1", "Gym", Proximity::ENTER);
        let center = InMemoryNotificationCenter::new(PermissionState::Denied);
        center.reject_posts(true);
        let out = NotificationEmitter::default().handle(&store, &center, "event:e1", Crossing::Enter);
        assert!(out.is_some());
        assert!(center.posted().is_empty());
    }
}
