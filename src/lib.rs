//! # Route Pacer
//!
//! Live GPS route matching, personal-record pacing and split analytics.
//!
//! This library provides:
//! - Detection of which saved route a live GPS track is retracing
//! - Progress comparison against the matched route's personal record (PR)
//! - Per-kilometer split tracking with pace statistics
//!
//! ## Features
//!
//! - **`parallel`** - Score candidate routes in parallel with rayon
//! - **`persistence`** - SQLite-backed route store
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_pacer::{ActivityType, GpsPoint, InMemoryRouteStore, RouteMatchingEngine, SavedRoute};
//!
//! let coords: Vec<GpsPoint> = (0..20)
//!     .map(|i| GpsPoint::new(51.5074 + i as f64 * 0.0002, -0.1278))
//!     .collect();
//!
//! let route = SavedRoute::new("r1", "Canal loop", ActivityType::Running, coords.clone()).unwrap();
//! let mut store = InMemoryRouteStore::new();
//! store.insert(route);
//!
//! let engine = RouteMatchingEngine::new(store);
//! let found = engine.find_matching_route(&coords, ActivityType::Running);
//! assert_eq!(found.unwrap().route_id, "r1");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RoutePacerError};

// Geographic utilities (distance, bounds)
pub mod geo_utils;
pub use geo_utils::haversine_distance;

// Point matching against a single route
pub mod matching;
pub use matching::{find_closest_point, is_on_route, score_route, ClosestPoint};

// Route store and live position source contracts
pub mod store;
pub use store::{InMemoryRouteStore, LiveTrack, PositionSource, RouteStatsUpdate, RouteStore};

// Stateful route matching engine (one per activity session)
pub mod engine;
pub use engine::RouteMatchingEngine;

// Per-kilometer split tracking
pub mod splits;
pub use splits::{SplitProgress, SplitTracker};

// SQLite-backed route store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteRouteStore;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RoutePacerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A recorded GPS coordinate.
///
/// Altitude and timestamp are carried along for callers but ignored by
/// every distance computation.
///
/// # Example
/// ```
/// use route_pacer::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278).with_timestamp(1_700_000_000_000);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: Option<f64>,
    /// Unix timestamp in milliseconds
    pub timestamp: Option<i64>,
}

impl GpsPoint {
    /// Create a new GPS point without altitude or timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            timestamp: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        geo_utils::compute_bounds(points)
    }

    /// Whether the point lies inside the box grown by `margin_meters` on every side.
    ///
    /// Longitude wraps at ±180°, so a box hugging the antimeridian also holds
    /// points just across it. The east-west margin is sized at the box's
    /// poleward edge where a degree of longitude is shortest.
    pub fn contains_with_margin(&self, point: &GpsPoint, margin_meters: f64) -> bool {
        let lat_margin = geo_utils::meters_to_degrees_lat(margin_meters);
        let min_lat = self.min_lat - lat_margin;
        let max_lat = self.max_lat + lat_margin;
        if point.latitude < min_lat || point.latitude > max_lat {
            return false;
        }

        let poleward_lat = min_lat.abs().max(max_lat.abs()).min(90.0);
        let lng_margin = geo_utils::meters_to_degrees_lng(margin_meters, poleward_lat);
        let min_lng = self.min_lng - lng_margin;
        let max_lng = self.max_lng + lng_margin;

        [-360.0, 0.0, 360.0].iter().any(|shift| {
            let lng = point.longitude + shift;
            lng >= min_lng && lng <= max_lng
        })
    }
}

/// Kind of activity a saved route was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Cycling,
    Walking,
    Hiking,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Walking => "walking",
            ActivityType::Hiking => "hiking",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = RoutePacerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(ActivityType::Running),
            "cycling" => Ok(ActivityType::Cycling),
            "walking" => Ok(ActivityType::Walking),
            "hiking" => Ok(ActivityType::Hiking),
            other => Err(RoutePacerError::Internal {
                message: format!("unknown activity type '{}'", other),
            }),
        }
    }
}

/// A route saved by the user, owned by the route store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SavedRoute {
    pub id: String,
    pub name: String,
    pub activity_type: ActivityType,
    /// Recorded points, never empty
    pub coordinates: Vec<GpsPoint>,
    /// Route length in meters
    pub distance: f64,
    /// Elevation gain in meters
    pub elevation_gain: f64,
    /// PR completion time in seconds
    pub best_time: Option<f64>,
    /// PR pace in seconds per km
    pub best_pace: Option<f64>,
    /// Workout that set the PR
    pub linked_workout_id: Option<String>,
}

impl SavedRoute {
    /// Create a route without a PR. Distance is the length of the recorded
    /// polyline and elevation gain is the sum of positive altitude deltas.
    ///
    /// Fails with [`RoutePacerError::InvalidRoute`] when `coordinates` is empty.
    pub fn new(
        id: &str,
        name: &str,
        activity_type: ActivityType,
        coordinates: Vec<GpsPoint>,
    ) -> Result<Self> {
        let route = Self {
            id: id.to_string(),
            name: name.to_string(),
            activity_type,
            distance: geo_utils::polyline_length(&coordinates),
            elevation_gain: geo_utils::elevation_gain(&coordinates),
            coordinates,
            best_time: None,
            best_pace: None,
            linked_workout_id: None,
        };
        route.validate()?;
        Ok(route)
    }

    /// Attach a personal record. Both values must be positive.
    pub fn with_personal_record(mut self, best_time: f64, best_pace: f64) -> Result<Self> {
        self.best_time = Some(best_time);
        self.best_pace = Some(best_pace);
        self.validate()?;
        Ok(self)
    }

    /// Check the route invariants: non-empty coordinates and a PR pair that
    /// is either fully absent or fully present and positive.
    pub fn validate(&self) -> Result<()> {
        if self.coordinates.is_empty() {
            return Err(RoutePacerError::InvalidRoute {
                route_id: self.id.clone(),
                message: "route has no coordinates".to_string(),
            });
        }
        match (self.best_time, self.best_pace) {
            (None, None) => Ok(()),
            (Some(time), Some(pace)) if time > 0.0 && pace > 0.0 => Ok(()),
            _ => Err(RoutePacerError::InvalidRoute {
                route_id: self.id.clone(),
                message: "best time and best pace must both be set and positive".to_string(),
            }),
        }
    }
}

/// Best route match for a live track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteMatch {
    pub route_id: String,
    pub route_name: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub matched_points: u32,
    pub total_points: u32,
    /// 0 - 100
    pub match_percentage: f64,
}

/// Live progress measured against a route's PR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ProgressComparison {
    pub is_ahead_of_pr: bool,
    /// Seconds, positive = ahead of PR
    pub time_difference: f64,
    /// Seconds per km, positive = faster than PR pace
    pub pace_difference: f64,
    /// 0 - 100
    pub percent_complete: f64,
    /// Projected finish time in seconds at the current average pace
    pub estimated_finish_time: f64,
    pub pr_finish_time: f64,
}

/// One completed kilometer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Split {
    /// 1-based split number
    pub number: u32,
    pub distance_km: u32,
    /// Session elapsed time at the split boundary, seconds
    pub elapsed_time: f64,
    /// Time taken for this split, seconds
    pub split_time: f64,
    /// Seconds per km
    pub pace: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

/// How evenly the splits of a session were paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    Excellent,
    Good,
    Variable,
}

/// Aggregate statistics over a session's splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SplitStatistics {
    /// Mean split time, seconds per km
    pub average_pace: f64,
    pub fastest_split: Option<Split>,
    pub slowest_split: Option<Split>,
    pub is_negative_split: bool,
    pub consistency: Consistency,
}

/// A single split compared with the session average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum SplitComparison {
    Faster,
    Slower,
    Average,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for live route matching.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MatchConfig {
    /// Maximum distance from a route point for a live point to count as on-route.
    /// Default: 50.0 meters
    pub match_distance_meters: f64,

    /// Half-width of the index window searched around the expected route position.
    /// Default: 5
    pub search_window: u32,

    /// Minimum live points before matching is attempted.
    /// Default: 10
    pub min_points: u32,

    /// Minimum match percentage for a route to qualify.
    /// Default: 70.0%
    pub min_match_percentage: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_distance_meters: 50.0,
            search_window: 5,
            min_points: 10,
            min_match_percentage: 70.0,
        }
    }
}

/// Configuration for split statistics.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SplitConfig {
    /// Pace variance (s²) below which splits are `Excellent`.
    /// Default: 100.0 (~10 s/km standard deviation)
    pub excellent_variance: f64,

    /// Pace variance (s²) below which splits are `Good`.
    /// Default: 400.0 (~20 s/km standard deviation)
    pub good_variance: f64,

    /// Deadband around the average pace when comparing a single split.
    /// Default: 5.0 seconds
    pub average_deadband_seconds: f64,

    /// Minimum splits before negative-split detection is attempted.
    /// Default: 4
    pub negative_split_min_splits: u32,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            excellent_variance: 100.0,
            good_variance: 400.0,
            average_deadband_seconds: 5.0,
            negative_split_min_splits: 4,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
