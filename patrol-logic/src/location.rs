use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{config::millis, patrol::UtcDT};

/// Mean radius of the earth used for distance calculations
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A "part" of a location
pub type LocationComponent = f64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
/// A position of the device as reported by a Geolocation API
pub struct Position {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
    /// Accuracy radius in meters, if the provider reports one
    #[serde(default)]
    pub accuracy: Option<LocationComponent>,
    /// When the provider took this reading
    #[serde(default = "Utc::now")]
    pub timestamp: UtcDT,
}

impl Position {
    pub fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self {
            lat,
            long,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }

    /// Great-circle distance in meters to the given coordinates
    pub fn distance_to(&self, lat: LocationComponent, long: LocationComponent) -> f64 {
        haversine_meters(self.lat, self.long, lat, long)
    }
}

pub fn haversine_meters(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlong = (long2 - long1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlong / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// Cached positions younger than this are acceptable
    #[serde(with = "millis")]
    pub maximum_age: Duration,
    /// Give up acquiring a position after this long
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age: Duration::from_secs(10),
            timeout: Duration::from_secs(15),
        }
    }
}

pub trait LocationProvider: Send + Sync {
    /// Begin receiving position updates
    fn start_watching(&self, options: &WatchOptions);
    /// Stop receiving position updates
    fn stop_watching(&self);
    /// The latest known position, [None] if one hasn't been acquired yet
    fn position(&self) -> Option<Position>;
    /// Check if the current position is within `radius_meters` of the given coordinates.
    /// Always false when no position is known.
    fn is_within_radius(
        &self,
        lat: LocationComponent,
        long: LocationComponent,
        radius_meters: f64,
    ) -> bool {
        self.position()
            .is_some_and(|pos| pos.distance_to(lat, long) <= radius_meters)
    }
}

/// Keeps a [LocationProvider] watching for as long as it's alive
pub struct WatchGuard<'a, L: LocationProvider>(&'a L);

impl<'a, L: LocationProvider> WatchGuard<'a, L> {
    pub fn start(location: &'a L, options: &WatchOptions) -> Self {
        location.start_watching(options);
        Self(location)
    }
}

impl<L: LocationProvider> Drop for WatchGuard<'_, L> {
    fn drop(&mut self) {
        self.0.stop_watching();
    }
}
