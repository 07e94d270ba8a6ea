use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

pub mod provider;

pub use provider::{Geocoder, PositionSource};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A bare coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Coordinates plus the human readable address they were resolved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Geo {
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            address: address.into(),
        }
    }

    /// Geo without a known address; the coordinates double as the label.
    pub fn from_point(point: LatLng) -> Self {
        Self::new(point.lat, point.lng, point.to_string())
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(from: LatLng, to: LatLng) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // rounding can push `a` a hair above 1.0 for antipodal points
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distance shown next to a location: kilometres rounded to two decimals.
pub fn distance_km(from: LatLng, to: LatLng) -> f64 {
    let km = haversine_km(from, to);
    if !km.is_finite() {
        return 0.0;
    }
    ((km * 100.0).round() / 100.0).max(0.0)
}

/// Coarse "how long ago" label for a millisecond timestamp.
pub fn elapsed_time(past_ms: i64) -> String {
    elapsed_time_since(past_ms, now_millis())
}

pub fn elapsed_time_since(past_ms: i64, now_ms: i64) -> String {
    let diff = Duration::milliseconds(now_ms.saturating_sub(past_ms));
    if diff.is_negative() || diff < Duration::seconds(45) {
        return "just now".to_string();
    }
    if diff < Duration::minutes(90) {
        let mins = diff.whole_minutes().max(1);
        return format!("{mins}m ago");
    }
    if diff < Duration::hours(36) {
        let hours = diff.whole_hours().max(1);
        return format!("{hours}h ago");
    }
    if diff < Duration::days(30) {
        let days = diff.whole_days().max(1);
        return format!("{days}d ago");
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(past_ms) * 1_000_000)
        .map(|dt| dt.date().to_string())
        .unwrap_or_else(|_| "a while ago".to_string())
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
