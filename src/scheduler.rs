//! Admission under a fixed monitoring capacity.
//!
//! Every geofence gets a [`Priority`]. Sorting by priority (then id) and
//! keeping the first `capacity` entries yields the admitted set. Nothing is
//! deleted on eviction: an evicted geofence is simply not monitored until its
//! rank improves, e.g. once time moves toward its start date.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::geofence::Geofence;
use crate::store::GeofenceStore;

/// Scheduling bucket with its tie-break instant.
///
/// Variant order is the tier order: every `Upcoming` sorts before every
/// `EndingSoon`, which sorts before every `Indefinite`. Within a tier the
/// earlier instant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Starts in the future; soonest start first.
    Upcoming(DateTime<Utc>),
    /// Already started (or unbounded start) and ends in the future; soonest end first.
    EndingSoon(DateTime<Utc>),
    /// No bound in the future; least recently updated first.
    Indefinite(DateTime<Utc>),
}

impl Priority {
    /// Classifies `geofence` relative to `now`.
    ///
    /// Bounds equal to `now` count as past.
    #[must_use]
    pub fn of(geofence: &Geofence, now: DateTime<Utc>) -> Self {
        if let Some(start) = geofence.start_date.filter(|s| *s > now) {
            return Self::Upcoming(start);
        }
        if let Some(end) = geofence.end_date.filter(|e| *e > now) {
            return Self::EndingSoon(end);
        }
        Self::Indefinite(geofence.last_updated_at)
    }

    /// 0, 1 or 2.
    #[must_use]
    pub const fn tier(&self) -> u8 {
        match self {
            Self::Upcoming(_) => 0,
            Self::EndingSoon(_) => 1,
            Self::Indefinite(_) => 2,
        }
    }

    /// The secondary sort key.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Upcoming(at) | Self::EndingSoon(at) | Self::Indefinite(at) => *at,
        }
    }
}

fn compare(a: &(Priority, &Geofence), b: &(Priority, &Geofence)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id))
}

/// All geofences in admission order, best first.
#[must_use]
pub fn rank<'a, I>(geofences: I, now: DateTime<Utc>) -> Vec<(Priority, &'a Geofence)>
where
    I: IntoIterator<Item = &'a Geofence>,
{
    let mut ranked: Vec<(Priority, &Geofence)> = geofences
        .into_iter()
        .map(|g| (Priority::of(g, now), g))
        .collect();
    ranked.sort_by(compare);
    ranked
}

/// The first `capacity` geofences under [`rank`].
#[must_use]
pub fn select<'a, I>(geofences: I, now: DateTime<Utc>, capacity: usize) -> Vec<&'a Geofence>
where
    I: IntoIterator<Item = &'a Geofence>,
{
    rank(geofences, now)
        .into_iter()
        .take(capacity)
        .map(|(_, g)| g)
        .collect()
}

/// Ids of the admitted geofences, best first.
///
/// Deterministic: identical store contents and `now` give identical output.
#[must_use]
pub fn admitted(store: &GeofenceStore, now: DateTime<Utc>, capacity: usize) -> Vec<String> {
    select(store.iter(), now, capacity)
        .into_iter()
        .map(|g| g.id.clone())
        .collect()
}
