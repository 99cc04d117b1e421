//! Contracts for the collaborators the engines consume: the route store and
//! the live position source, plus in-memory implementations of both.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::{ActivityType, GpsPoint, SavedRoute};

/// Result of a finished workout, submitted to the store to record a new PR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteStatsUpdate {
    pub workout_id: String,
    /// Total workout time in seconds
    pub workout_time: f64,
    /// Workout pace in seconds per km
    pub workout_pace: f64,
}

impl RouteStatsUpdate {
    /// Whether this workout beats the route's current PR (or the route has none).
    pub fn beats(&self, route: &SavedRoute) -> bool {
        match route.best_time {
            Some(best) => self.workout_time < best,
            None => true,
        }
    }
}

/// Durable storage of saved routes.
///
/// Iteration order of `routes_by_activity` is significant: the matching
/// engine keeps the first route on confidence ties.
pub trait RouteStore {
    /// All routes recorded for the given activity type. An empty list is a
    /// valid answer, not an error.
    fn routes_by_activity(&self, activity_type: ActivityType) -> Result<Vec<SavedRoute>>;

    /// Look up a single route by id.
    fn route(&self, route_id: &str) -> Result<Option<SavedRoute>>;

    /// Record a finished workout against a route.
    fn update_route_stats(&mut self, route_id: &str, update: &RouteStatsUpdate) -> Result<()>;
}

/// Apply a stats update to a route in place. Only faster workouts replace the PR.
///
/// Returns whether the PR changed.
pub(crate) fn apply_stats_update(route: &mut SavedRoute, update: &RouteStatsUpdate) -> bool {
    if !update.beats(route) || update.workout_time <= 0.0 || update.workout_pace <= 0.0 {
        debug!(
            "[RouteStore] Workout {} ({:.0}s) does not beat PR on {}",
            update.workout_id, update.workout_time, route.id
        );
        return false;
    }

    info!(
        "[RouteStore] New PR on {}: {:.0}s (was {:?})",
        route.id, update.workout_time, route.best_time
    );
    route.best_time = Some(update.workout_time);
    route.best_pace = Some(update.workout_pace);
    route.linked_workout_id = Some(update.workout_id.clone());
    true
}

/// Route store held entirely in memory, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteStore {
    routes: Vec<SavedRoute>,
}

impl InMemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from routes, keeping their order.
    pub fn from_routes(routes: Vec<SavedRoute>) -> Self {
        Self { routes }
    }

    /// Insert a route, replacing any existing route with the same id in place.
    pub fn insert(&mut self, route: SavedRoute) {
        match self.routes.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    /// Remove a route. Returns the removed route, if any.
    pub fn remove(&mut self, route_id: &str) -> Option<SavedRoute> {
        let pos = self.routes.iter().position(|r| r.id == route_id)?;
        Some(self.routes.remove(pos))
    }

    /// All routes in store order.
    pub fn routes(&self) -> &[SavedRoute] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteStore for InMemoryRouteStore {
    fn routes_by_activity(&self, activity_type: ActivityType) -> Result<Vec<SavedRoute>> {
        Ok(self
            .routes
            .iter()
            .filter(|r| r.activity_type == activity_type)
            .cloned()
            .collect())
    }

    fn route(&self, route_id: &str) -> Result<Option<SavedRoute>> {
        Ok(self.routes.iter().find(|r| r.id == route_id).cloned())
    }

    fn update_route_stats(&mut self, route_id: &str, update: &RouteStatsUpdate) -> Result<()> {
        let route = self
            .routes
            .iter_mut()
            .find(|r| r.id == route_id)
            .ok_or_route_not_found(route_id)?;
        apply_stats_update(route, update);
        Ok(())
    }
}

/// Supplies the growing list of positions for the current activity.
pub trait PositionSource {
    /// Snapshot of all positions recorded so far, oldest first.
    fn current_positions(&self) -> Vec<GpsPoint>;
}

/// Append-only position buffer for a live session.
#[derive(Debug, Clone, Default)]
pub struct LiveTrack {
    points: Vec<GpsPoint>,
}

impl LiveTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position. Invalid coordinates are dropped.
    ///
    /// Returns whether the point was kept.
    pub fn push(&mut self, point: GpsPoint) -> bool {
        if !point.is_valid() {
            debug!(
                "[LiveTrack] Dropping invalid point ({}, {})",
                point.latitude, point.longitude
            );
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance covered so far in meters.
    pub fn distance(&self) -> f64 {
        crate::geo_utils::polyline_length(&self.points)
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    /// Discard all positions for a new session.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl PositionSource for LiveTrack {
    fn current_positions(&self) -> Vec<GpsPoint> {
        self.points.clone()
    }
}
