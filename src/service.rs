//! Serial worker for the geofencing core.
//!
//! One named thread owns the [`GeofenceManager`]. Caller commands and platform
//! events share a single bounded FIFO queue, so a command always observes the
//! effects of every event enqueued before it:
//!
//! - `upsert` / `remove` / `refresh` block until the worker has applied them
//! - region crossings use non-blocking `try_send` and are dropped (and
//!   counted) when the queue is full
//! - authorization changes set a pending flag before waking the worker, so a
//!   full queue coalesces them instead of losing the resync
//!
//! Nothing here returns an error to the caller after construction. If the
//! worker is gone, commands are logged and ignored.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::config::GeofencingConfig;
use crate::error::{GeofenceError, GeofenceResult};
use crate::geofence::GeofenceRequest;
use crate::manager::GeofenceManager;
use crate::notify::Crossing;
use crate::platform::Platform;
use crate::storage::KeyValueStore;
use crate::time::Clock;

#[derive(Debug)]
enum Message {
    Upsert {
        request: GeofenceRequest,
        reply: Sender<()>,
    },
    Remove {
        id: String,
        reply: Sender<()>,
    },
    Refresh {
        reply: Sender<()>,
    },
    AuthorizationChanged,
    RegionCrossed {
        identifier: String,
        crossing: Crossing,
    },
    Shutdown,
}

/// Cloneable handle through which a platform adapter reports events.
///
/// Never blocks. Region crossings that do not fit in the queue are dropped;
/// see [`GeofencingService::dropped_events`]. Authorization changes are never
/// dropped while the worker runs: they collapse into one pending resync.
#[derive(Debug, Clone)]
pub struct PlatformEventSink {
    tx: Sender<Message>,
    dropped: Arc<AtomicU64>,
    resync: Arc<AtomicBool>,
}

impl PlatformEventSink {
    fn offer(&self, msg: Message) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Location or notification authorization changed.
    pub fn authorization_changed(&self) {
        self.resync.store(true, Ordering::SeqCst);
        match self.tx.try_send(Message::AuthorizationChanged) {
            // A full queue means the worker has messages left to take; it
            // sees the flag before handling the next one.
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// The device entered the region named `identifier`.
    pub fn region_entered(&self, identifier: impl Into<String>) {
        self.offer(Message::RegionCrossed {
            identifier: identifier.into(),
            crossing: Crossing::Enter,
        });
    }

    /// The device left the region named `identifier`.
    pub fn region_exited(&self, identifier: impl Into<String>) {
        self.offer(Message::RegionCrossed {
            identifier: identifier.into(),
            crossing: Crossing::Exit,
        });
    }
}

/// Geofencing running on its own serial context.
///
/// ```rust,ignore
/// let service = GeofencingService::spawn(config, kv, platform, Arc::new(SystemClock))?;
/// adapter.set_sink(service.events());
/// service.upsert(GeofenceRequest::new(event_id, title, coordinate).starts_at(start));
/// ```
#[derive(Debug)]
pub struct GeofencingService {
    tx: Sender<Message>,
    dropped_events: Arc<AtomicU64>,
    resync: Arc<AtomicBool>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl GeofencingService {
    /// Builds the manager, spawns the worker and runs the initial sync on it.
    ///
    /// # Errors
    /// - `GeofenceError::Config` if `config` is invalid
    /// - `GeofenceError::Internal` if the worker thread cannot be spawned
    pub fn spawn(
        config: GeofencingConfig,
        backend: Arc<dyn KeyValueStore>,
        platform: Platform,
        clock: Arc<dyn Clock>,
    ) -> GeofenceResult<Self> {
        let queue_capacity = config.queue_capacity.max(1);
        let manager = GeofenceManager::new(config, backend, platform, clock)?;

        let (tx, rx) = bounded::<Message>(queue_capacity);
        let resync = Arc::new(AtomicBool::new(false));
        let worker_resync = Arc::clone(&resync);

        let join = thread::Builder::new()
            .name("geofencing-worker".to_string())
            .spawn(move || worker_loop(manager, rx, &worker_resync))
            .map_err(|e| GeofenceError::internal(format!("failed to spawn geofencing worker: {e}")))?;

        Ok(Self {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
            resync,
            join: Mutex::new(Some(join)),
        })
    }

    /// A sink for the platform adapter.
    #[must_use]
    pub fn events(&self) -> PlatformEventSink {
        PlatformEventSink {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped_events),
            resync: Arc::clone(&self.resync),
        }
    }

    /// Create or update a geofence. Returns once persisted and synced.
    pub fn upsert(&self, request: GeofenceRequest) {
        self.call("upsert", |reply| Message::Upsert { request, reply });
    }

    /// Delete a geofence. Returns once persisted and synced.
    pub fn remove(&self, id: impl Into<String>) {
        let id = id.into();
        self.call("remove", |reply| Message::Remove { id, reply });
    }

    /// Re-rank against the current time. Returns once synced.
    ///
    /// Also acts as a barrier: every event enqueued before this call has been
    /// handled when it returns.
    pub fn refresh(&self) {
        self.call("refresh", |reply| Message::Refresh { reply });
    }

    /// Region crossings dropped because the queue was full, plus any event
    /// offered after the worker stopped.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Stops the worker after it drains queued messages, and waits for it.
    pub fn shutdown(self) {
        // The worker also stops once every sender is gone; Shutdown makes it
        // prompt even while sinks are still alive.
        if self.tx.send(Message::Shutdown).is_err() {
            debug!("geofencing worker already stopped");
        }
        let handle = match self.join.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("geofencing worker panicked");
            }
        }
    }

    fn call(&self, op: &'static str, build: impl FnOnce(Sender<()>) -> Message) {
        let (reply_tx, reply_rx) = bounded::<()>(1);
        if self.tx.send(build(reply_tx)).is_err() {
            warn!(op, "geofencing worker is gone, dropping command");
            return;
        }
        if reply_rx.recv().is_err() {
            warn!(op, "geofencing worker stopped before acknowledging");
        }
    }
}

impl Drop for GeofencingService {
    fn drop(&mut self) {
        // Detach rather than join: sinks handed to the platform adapter keep
        // the queue open, and the worker exits once they are all dropped.
        let handle = match self.join.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(handle);
    }
}

fn worker_loop(mut manager: GeofenceManager, rx: Receiver<Message>, resync: &AtomicBool) {
    let report = manager.start();
    info!(outcome = ?report.outcome, calls = report.call_count(), "geofencing worker started");

    while let Ok(msg) = rx.recv() {
        // Runs before the message so that a command observes every
        // authorization change reported ahead of it.
        if resync.swap(false, Ordering::SeqCst) {
            manager.authorization_changed();
        }

        match msg {
            Message::Upsert { request, reply } => {
                manager.upsert(request);
                let _ = reply.send(());
            }
            Message::Remove { id, reply } => {
                manager.remove(&id);
                let _ = reply.send(());
            }
            Message::Refresh { reply } => {
                manager.refresh();
                let _ = reply.send(());
            }
            // Wake-up only; the flag above carries the change.
            Message::AuthorizationChanged => {}
            Message::RegionCrossed { identifier, crossing } => {
                manager.region_crossed(&identifier, crossing);
            }
            Message::Shutdown => break,
        }
    }

    info!("geofencing worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::error::PlatformError;
    use crate::geofence::Coordinate;
    use crate::notify::NotificationRequest;
    use crate::permission::{LocationAuthorization, NotificationOptions, PermissionState};
    use crate::platform::{
        InMemoryLocationAuthorizer, InMemoryNotificationCenter, InMemoryRegionMonitor, NotificationCenter,
    };
    use crate::storage::InMemoryKeyValueStore;
    use crate::time::ManualClock;

    /// Parks the worker inside the first `post` until released.
    struct HoldingNotificationCenter {
        inner: InMemoryNotificationCenter,
        hold: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    }

    impl NotificationCenter for HoldingNotificationCenter {
        fn authorization(&self) -> PermissionState {
            self.inner.authorization()
        }

        fn request_authorization(&self, options: NotificationOptions) {
            self.inner.request_authorization(options);
        }

        fn post(&self, request: &NotificationRequest) -> Result<(), PlatformError> {
            let hold = self.hold.lock().unwrap().take();
            if let Some((entered, release)) = hold {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
            self.inner.post(request)
        }
    }

    #[test]
    fn test_events_processed_in_order_with_commands() {
        let monitor = Arc::new(InMemoryRegionMonitor::new());
        let location = Arc::new(InMemoryLocationAuthorizer::new(LocationAuthorization::Denied));
        let notifications = Arc::new(InMemoryNotificationCenter::new(PermissionState::Granted));

        let service = GeofencingService::spawn(
            GeofencingConfig::default(),
            Arc::new(InMemoryKeyValueStore::new()),
            Platform {
                monitor: monitor.clone(),
                location: location.clone(),
                notifications: notifications.clone(),
            },
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap();

        service.upsert(GeofenceRequest::new("a", "A", Coordinate::new(0.0, 0.0)));
        assert!(monitor.identifiers().is_empty());

        location.set_status(LocationAuthorization::Always);
        let sink = service.events();
        sink.authorization_changed();
        sink.region_entered("event:a");
        service.refresh();

        assert_eq!(monitor.identifiers(), vec!["event:a".to_string()]);
        assert_eq!(notifications.posted().len(), 1);
        assert_eq!(service.dropped_events(), 0);

        service.shutdown();
    }

    #[test]
    fn test_commands_after_shutdown_are_ignored() {
        let service = GeofencingService::spawn(
            GeofencingConfig::default(),
            Arc::new(InMemoryKeyValueStore::new()),
            Platform {
                monitor: Arc::new(InMemoryRegionMonitor::new()),
                location: Arc::new(InMemoryLocationAuthorizer::new(LocationAuthorization::Always)),
                notifications: Arc::new(InMemoryNotificationCenter::new(PermissionState::Granted)),
            },
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap();

        let sink = service.events();
        service.shutdown();

        sink.authorization_changed();
        sink.region_exited("event:a");
        // Both were refused by a closed queue; the sink never blocks.
    }

    #[test]
    fn test_authorization_change_survives_full_queue() {
        let monitor = Arc::new(InMemoryRegionMonitor::new());
        let location = Arc::new(InMemoryLocationAuthorizer::new(LocationAuthorization::Denied));
        let (entered_tx, entered_rx) = bounded::<()>(1);
        let (release_tx, release_rx) = bounded::<()>(1);
        let notifications = Arc::new(HoldingNotificationCenter {
            inner: InMemoryNotificationCenter::new(PermissionState::Granted),
            hold: Mutex::new(Some((entered_tx, release_rx))),
        });

        let service = GeofencingService::spawn(
            GeofencingConfig {
                queue_capacity: 1,
                ..GeofencingConfig::default()
            },
            Arc::new(InMemoryKeyValueStore::new()),
            Platform {
                monitor: monitor.clone(),
                location: location.clone(),
                notifications: notifications.clone(),
            },
            Arc::new(ManualClock::new(Utc::now())),
        )
        .unwrap();

        // Stored but not monitored while location is denied.
        service.upsert(GeofenceRequest::new("a", "A", Coordinate::new(0.0, 0.0)));
        assert!(monitor.identifiers().is_empty());

        let sink = service.events();
        sink.region_entered("event:a");
        entered_rx.recv().unwrap();

        // Worker is busy posting; this fills the single slot.
        sink.region_entered("event:a");
        location.set_status(LocationAuthorization::Always);
        sink.authorization_changed();
        assert_eq!(service.dropped_events(), 0);

        release_tx.send(()).unwrap();
        // Shutdown queues behind the pending crossing and joins the worker.
        service.shutdown();

        assert_eq!(monitor.identifiers(), vec!["event:a".to_string()]);
        assert_eq!(notifications.inner.posted().len(), 2);
    }
}
