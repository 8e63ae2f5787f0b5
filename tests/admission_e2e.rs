//! Admission and reconciliation under capacity pressure.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use geofencing::platform::{
    InMemoryLocationAuthorizer, InMemoryNotificationCenter, InMemoryRegionMonitor, MonitorCall,
};
use geofencing::scheduler;
use geofencing::{
    Clock, Coordinate, GeofenceManager, GeofenceRequest, GeofencingConfig, InMemoryKeyValueStore,
    LocationAuthorization, ManualClock, PermissionState, Platform, Priority, Proximity,
};

struct Fixture {
    manager: GeofenceManager,
    monitor: Arc<InMemoryRegionMonitor>,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let monitor = Arc::new(InMemoryRegionMonitor::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = GeofenceManager::new(
        GeofencingConfig::default(),
        Arc::new(InMemoryKeyValueStore::new()),
        Platform {
            monitor: monitor.clone(),
            location: Arc::new(InMemoryLocationAuthorizer::new(LocationAuthorization::Always)),
            notifications: Arc::new(InMemoryNotificationCenter::new(PermissionState::Granted)),
        },
        clock.clone(),
    )
    .unwrap();
    Fixture { manager, monitor, clock }
}

fn at(id: &str, lat: f64) -> GeofenceRequest {
    GeofenceRequest::new(id, format!("Event {id}"), Coordinate::new(lat, 13.4))
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

fn event_ids(identifiers: Vec<String>) -> Vec<String> {
    sorted(
        identifiers
            .into_iter()
            .filter_map(|i| i.strip_prefix("event:").map(str::to_string))
            .collect(),
    )
}

#[test]
fn test_under_capacity_everything_is_admitted() {
    let mut f = fixture();
    let mut expected = Vec::new();
    for i in 0..20 {
        let id = format!("g{i:02}");
        f.manager.upsert(at(&id, f64::from(i)));
        expected.push(id);
    }

    assert_eq!(sorted(f.manager.admitted()), expected);
    assert_eq!(event_ids(f.monitor.identifiers()), expected);
}

#[test]
fn test_over_capacity_keeps_the_twenty_best() {
    let mut f = fixture();
    let now = f.clock.now();

    // 15 undated, oldest first.
    for i in 0..15 {
        f.manager.upsert(at(&format!("idle{i:02}"), 1.0));
        f.clock.advance(Duration::seconds(1));
    }
    // 10 upcoming; these must all be admitted.
    for i in 0..10 {
        f.manager
            .upsert(at(&format!("soon{i:02}"), 2.0).starts_at(now + Duration::hours(i64::from(i) + 1)));
    }

    let admitted = f.manager.admitted();
    assert_eq!(admitted.len(), 20);
    assert!(admitted[..10].iter().all(|id| id.starts_with("soon")));
    // The ten oldest idle ones fill the rest; the five most recently touched are evicted.
    for i in 0..10 {
        assert!(admitted.contains(&format!("idle{i:02}")));
    }
    for i in 10..15 {
        assert!(!admitted.contains(&format!("idle{i:02}")));
    }

    assert_eq!(event_ids(f.monitor.identifiers()), sorted(admitted));
    // Evicted geofences stay stored.
    assert_eq!(f.manager.store().len(), 25);
}

#[test]
fn test_upcoming_ranking_and_eviction_order() {
    let mut f = fixture();
    let t0 = f.clock.now();

    // Twenty older undated geofences occupy every slot.
    for i in 0..20 {
        f.manager.upsert(at(&format!("filler{i:02}"), 0.5));
    }
    f.clock.advance(Duration::minutes(1));
    let now = f.clock.now();

    f.manager.upsert(at("C", 3.0));
    f.manager.upsert(at("A", 1.0).starts_at(now + Duration::hours(1)));
    f.manager.upsert(at("B", 2.0).starts_at(now + Duration::minutes(5)));

    let ranked: Vec<String> = scheduler::rank(f.manager.store().iter(), now)
        .into_iter()
        .map(|(_, g)| g.id.clone())
        .collect();
    assert_eq!(ranked[0], "B");
    assert_eq!(ranked[1], "A");
    assert_eq!(ranked.last().map(String::as_str), Some("C"));

    let admitted = f.manager.admitted();
    assert!(admitted.contains(&"A".to_string()));
    assert!(admitted.contains(&"B".to_string()));
    assert!(!admitted.contains(&"C".to_string()));
    assert!(f.monitor.region("event:C").is_none());

    // Shrinking capacity among the three alone: C goes first, then A.
    let trio: Vec<_> = f
        .manager
        .store()
        .iter()
        .filter(|g| ["A", "B", "C"].contains(&g.id.as_str()))
        .collect();
    let ids = |cap| -> Vec<String> {
        scheduler::select(trio.iter().copied(), now, cap)
            .into_iter()
            .map(|g| g.id.clone())
            .collect()
    };
    assert_eq!(ids(3), vec!["B", "A", "C"]);
    assert_eq!(ids(2), vec!["B", "A"]);
    assert_eq!(ids(1), vec!["B"]);

    assert!(matches!(
        scheduler::rank(trio.iter().copied(), now)[2].0,
        Priority::Indefinite(updated) if updated > t0
    ));
}

#[test]
fn test_second_pass_issues_no_calls() {
    let mut f = fixture();
    for i in 0..25 {
        f.manager.upsert(at(&format!("g{i:02}"), f64::from(i)));
    }
    let first = f.manager.admitted();
    f.monitor.take_calls();

    let report = f.manager.refresh();
    assert_eq!(report.call_count(), 0);
    assert!(f.monitor.calls().is_empty());
    assert_eq!(f.manager.admitted(), first);
}

#[test]
fn test_title_only_edit_causes_no_churn() {
    let mut f = fixture();
    f.manager.upsert(at("x", 5.0).radius(300.0).proximity(Proximity::BOTH));
    f.monitor.take_calls();

    f.clock.advance(Duration::minutes(3));
    let report = f.manager.upsert(
        GeofenceRequest::new("x", "Renamed", Coordinate::new(5.0, 13.4))
            .radius(300.0)
            .proximity(Proximity::BOTH),
    );

    assert_eq!(report.call_count(), 0);
    assert!(f.monitor.calls().is_empty());
}

#[test]
fn test_moving_a_geofence_replaces_its_region() {
    let mut f = fixture();
    f.manager.upsert(at("x", 5.0));
    f.monitor.take_calls();

    f.manager.upsert(at("x", 6.0));
    let calls = f.monitor.take_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], MonitorCall::Stop("event:x".to_string()));
    assert!(matches!(&calls[1], MonitorCall::Start(r) if r.center.latitude == 6.0));
}

#[test]
fn test_remove_of_absent_id_changes_nothing() {
    let mut f = fixture();
    f.manager.upsert(at("x", 5.0));
    f.monitor.take_calls();

    let report = f.manager.remove("never-existed");
    assert_eq!(report.call_count(), 0);
    assert_eq!(f.manager.store().len(), 1);
}

#[test]
fn test_upsert_timestamps() {
    let mut f = fixture();
    let t0: DateTime<Utc> = f.clock.now();
    f.manager.upsert(at("x", 5.0));
    f.clock.advance(Duration::hours(2));
    f.manager.upsert(at("x", 5.0).radius(10.0));

    let gf = f.manager.store().get("x").unwrap();
    assert_eq!(gf.created_at, t0);
    assert_eq!(gf.last_updated_at, t0 + Duration::hours(2));
    assert_eq!(gf.radius, 50.0);
}
