//! The geofence record and the request used to create or update one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Which boundary crossings should notify.
///
/// Enter and exit are independent; `Proximity::default()` is enter-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proximity {
    /// Notify when the device enters the region.
    pub enter: bool,
    /// Notify when the device leaves the region.
    pub exit: bool,
}

impl Proximity {
    /// Enter only.
    pub const ENTER: Self = Self { enter: true, exit: false };
    /// Exit only.
    pub const EXIT: Self = Self { enter: false, exit: true };
    /// Enter and exit.
    pub const BOTH: Self = Self { enter: true, exit: true };
    /// Neither. The region is still monitored but never notifies.
    pub const NONE: Self = Self { enter: false, exit: false };
}

impl Default for Proximity {
    fn default() -> Self {
        Self::ENTER
    }
}

/// A named circular region tied to an owning event.
///
/// Field names are the persisted JSON keys; keep them stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Caller-supplied stable id.
    pub id: String,
    /// Display title used in notifications.
    pub title: String,
    /// Center latitude in degrees.
    pub latitude: f64,
    /// Center longitude in degrees.
    pub longitude: f64,
    /// Metres, already clamped.
    pub radius: f64,
    /// Notify on entry.
    pub notify_on_enter: bool,
    /// Notify on exit.
    pub notify_on_exit: bool,
    /// Optional start bound.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional end bound.
    pub end_date: Option<DateTime<Utc>>,
    /// First insertion time; kept across updates.
    pub created_at: DateTime<Utc>,
    /// Time of the latest upsert.
    pub last_updated_at: DateTime<Utc>,
}

impl Geofence {
    /// Center of the region.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Notification preferences.
    #[must_use]
    pub const fn proximity(&self) -> Proximity {
        Proximity {
            enter: self.notify_on_enter,
            exit: self.notify_on_exit,
        }
    }
}

/// Parameters for `upsert`.
///
/// ```
/// use geofencing::{Coordinate, GeofenceRequest, Proximity};
/// use chrono::{Duration, Utc};
///
/// let req = GeofenceRequest::new("evt-42", "Dentist", Coordinate::new(51.5, -0.12))
///     .radius(300.0)
///     .proximity(Proximity::BOTH)
///     .starts_at(Utc::now() + Duration::hours(3));
/// assert_eq!(req.radius, Some(300.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceRequest {
    /// Caller-supplied stable id, usually derived from the owning event.
    pub id: String,
    /// Display title used in notifications.
    pub title: String,
    /// Region center.
    pub coordinate: Coordinate,
    /// Requested radius in metres. `None` takes the configured default.
    pub radius: Option<f64>,
    /// Enter/exit preferences.
    pub proximity: Proximity,
    /// Optional start bound.
    pub start_date: Option<DateTime<Utc>>,
    /// Optional end bound.
    pub end_date: Option<DateTime<Utc>>,
}

impl GeofenceRequest {
    /// Creates a request with default radius and enter-only proximity.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            coordinate,
            radius: None,
            proximity: Proximity::default(),
            start_date: None,
            end_date: None,
        }
    }

    /// Requested radius in metres; clamped on upsert.
    #[must_use]
    pub fn radius(mut self, metres: f64) -> Self {
        self.radius = Some(metres);
        self
    }

    /// Sets the enter/exit preferences.
    #[must_use]
    pub fn proximity(mut self, proximity: Proximity) -> Self {
        self.proximity = proximity;
        self
    }

    /// Sets the start bound.
    #[must_use]
    pub fn starts_at(mut self, at: DateTime<Utc>) -> Self {
        self.start_date = Some(at);
        self
    }

    /// Sets the end bound.
    #[must_use]
    pub fn ends_at(mut self, at: DateTime<Utc>) -> Self {
        self.end_date = Some(at);
        self
    }

    /// Sets both bounds at once; either may be `None`.
    #[must_use]
    pub fn window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}
