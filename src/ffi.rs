//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the engines to
//! Kotlin and Swift. Engines are wrapped in objects holding a `Mutex`
//! because UniFFI hands out shared references; the session driver still
//! calls them sequentially. Free functions are prefixed with `ffi_` to avoid
//! naming conflicts with the internal API.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use crate::store::{InMemoryRouteStore, RouteStatsUpdate, RouteStore};
use crate::{
    init_logging, ActivityType, GpsPoint, MatchConfig, ProgressComparison, RouteMatch,
    RouteMatchingEngine, SavedRoute, Split, SplitComparison, SplitProgress, SplitStatistics,
    SplitTracker,
};

// ============================================================================
// Free Functions
// ============================================================================

/// Great-circle distance between two points in meters.
#[uniffi::export]
pub fn ffi_haversine_distance(a: GpsPoint, b: GpsPoint) -> f64 {
    crate::haversine_distance(&a, &b)
}

/// Get default match configuration.
#[uniffi::export]
pub fn ffi_default_match_config() -> MatchConfig {
    init_logging();
    info!("[RoutePacerRust] default_match_config called - Rust is active!");
    MatchConfig::default()
}

// ============================================================================
// Route Matcher
// ============================================================================

/// Route matching engine backed by routes pushed from the app.
#[derive(uniffi::Object)]
pub struct FfiRouteMatcher {
    inner: Mutex<RouteMatchingEngine<InMemoryRouteStore>>,
}

impl FfiRouteMatcher {
    fn engine(&self) -> MutexGuard<'_, RouteMatchingEngine<InMemoryRouteStore>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl FfiRouteMatcher {
    #[uniffi::constructor]
    pub fn new(config: MatchConfig) -> Arc<Self> {
        init_logging();
        info!("[RoutePacerRust] Route matcher created");
        Arc::new(Self {
            inner: Mutex::new(RouteMatchingEngine::with_config(
                InMemoryRouteStore::new(),
                config,
            )),
        })
    }

    /// Replace all saved routes. Invalid routes are skipped.
    ///
    /// Returns the number of routes kept.
    pub fn set_routes(&self, routes: Vec<SavedRoute>) -> u32 {
        let valid: Vec<SavedRoute> = routes.into_iter().filter(|r| r.validate().is_ok()).collect();
        let count = valid.len() as u32;
        *self.engine().store_mut() = InMemoryRouteStore::from_routes(valid);
        info!("[RoutePacerRust] Loaded {} saved routes", count);
        count
    }

    /// Add or replace one route. Returns false if the route is invalid.
    pub fn add_route(&self, route: SavedRoute) -> bool {
        if let Err(e) = route.validate() {
            debug!("[RoutePacerRust] Rejected route: {}", e);
            return false;
        }
        self.engine().store_mut().insert(route);
        true
    }

    pub fn find_matching_route(
        &self,
        points: Vec<GpsPoint>,
        activity_type: ActivityType,
    ) -> Option<RouteMatch> {
        self.engine().find_matching_route(&points, activity_type)
    }

    pub fn compare_with_pr(
        &self,
        route_id: String,
        current_distance: f64,
        current_time: f64,
    ) -> Option<ProgressComparison> {
        self.engine()
            .compare_with_pr(&route_id, current_distance, current_time)
    }

    /// Pin a saved route by id. Returns false if it is unknown.
    pub fn start_matching(&self, route_id: String) -> bool {
        let mut engine = self.engine();
        let route = engine.store().route(&route_id);
        match route {
            Ok(Some(route)) => {
                engine.start_matching(route);
                true
            }
            _ => false,
        }
    }

    pub fn stop_matching(&self) {
        self.engine().stop_matching();
    }

    /// Adopt an auto-matched route by id, or clear it with `None`.
    pub fn set_matched_route(&self, route_id: Option<String>) {
        let mut engine = self.engine();
        let route = route_id.and_then(|id| engine.store().route(&id).ok().flatten());
        engine.set_matched_route(route);
    }

    pub fn matched_route(&self) -> Option<SavedRoute> {
        self.engine().matched_route().cloned()
    }

    pub fn personal_record_update(
        &self,
        route_id: String,
        workout_id: String,
        total_time: f64,
        total_distance: f64,
    ) -> Option<RouteStatsUpdate> {
        self.engine()
            .personal_record_update(&route_id, &workout_id, total_time, total_distance)
    }

    /// Record a finished workout. Returns false if the route is unknown.
    pub fn update_route_stats(&self, route_id: String, update: RouteStatsUpdate) -> bool {
        self.engine()
            .store_mut()
            .update_route_stats(&route_id, &update)
            .is_ok()
    }
}

// ============================================================================
// Split Tracker
// ============================================================================

/// Per-kilometer split tracker for one activity session.
#[derive(uniffi::Object)]
pub struct FfiSplitTracker {
    inner: Mutex<SplitTracker>,
}

impl Default for FfiSplitTracker {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SplitTracker::new()),
        }
    }
}

impl FfiSplitTracker {
    fn tracker(&self) -> MutexGuard<'_, SplitTracker> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl FfiSplitTracker {
    #[uniffi::constructor]
    pub fn new() -> Arc<Self> {
        init_logging();
        Arc::new(Self::default())
    }

    pub fn start(&self, start_time: i64) {
        info!("[RoutePacerRust] Split tracking started");
        self.tracker().start(start_time);
    }

    pub fn update(
        &self,
        current_distance: f64,
        current_elapsed: f64,
        paused_duration_ms: u64,
    ) -> Option<Split> {
        self.tracker()
            .update(current_distance, current_elapsed, paused_duration_ms)
    }

    pub fn update_with_backfill(
        &self,
        current_distance: f64,
        current_elapsed: f64,
        paused_duration_ms: u64,
    ) -> Vec<Split> {
        self.tracker()
            .update_with_backfill(current_distance, current_elapsed, paused_duration_ms)
    }

    pub fn current_split_progress(&self, current_distance: f64) -> SplitProgress {
        self.tracker().current_split_progress(current_distance)
    }

    pub fn statistics(&self) -> Option<SplitStatistics> {
        self.tracker().statistics()
    }

    pub fn compare_split_to_average(&self, split: Split) -> SplitComparison {
        self.tracker().compare_split_to_average(&split)
    }

    pub fn splits(&self) -> Vec<Split> {
        self.tracker().splits().to_vec()
    }
}
