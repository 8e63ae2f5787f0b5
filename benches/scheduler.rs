use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use geofencing::platform::{InMemoryLocationAuthorizer, InMemoryRegionMonitor};
use geofencing::scheduler;
use geofencing::{
    Coordinate, GeofenceRequest, GeofenceStore, InMemoryKeyValueStore, LocationAuthorization,
    RegionReconciler,
};

fn make_store(n: u32) -> GeofenceStore {
    let mut store = GeofenceStore::load(Arc::new(InMemoryKeyValueStore::new()), "bench");
    let now = Utc::now();

    // A third upcoming, a third ending soon, a third undated.
    for i in 0..n {
        let offset = Duration::minutes(i64::from(i));
        let request = GeofenceRequest::new(
            format!("evt-{i:05}"),
            "Bench",
            Coordinate::new(f64::from(i % 90), f64::from(i % 180)),
        );
        let request = match i % 3 {
            0 => request.starts_at(now + offset + Duration::hours(1)),
            1 => request.ends_at(now + offset + Duration::hours(1)),
            _ => request,
        };
        store.upsert(request, now - offset);
    }
    store
}

fn bench_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler/admit");
    let now = Utc::now();

    for n in [20u32, 200, 1_000] {
        let store = make_store(n);
        group.throughput(Throughput::Elements(u64::from(n)));
        group.bench_with_input(BenchmarkId::from_parameter(n), &store, |b, store| {
            b.iter(|| scheduler::admitted(store, now, 20));
        });
    }
    group.finish();
}

fn bench_reconcile_steady_state(c: &mut Criterion) {
    let store = make_store(1_000);
    let now = Utc::now();
    let monitor = InMemoryRegionMonitor::new();
    let location = InMemoryLocationAuthorizer::new(LocationAuthorization::Always);
    let reconciler = RegionReconciler::default();

    // Warm the monitor so every measured pass is a no-op diff.
    reconciler.reconcile(&store, now, &monitor, &location);
    monitor.take_calls();

    c.bench_function("reconciler/steady_state_1000", |b| {
        b.iter(|| reconciler.reconcile(&store, now, &monitor, &location));
    });
}

criterion_group!(benches, bench_admit, bench_reconcile_steady_state);
criterion_main!(benches);
