//! # Route Matching Engine
//!
//! Stateful engine that detects which saved route a live track is retracing
//! and measures live progress against that route's personal record.
//!
//! ## Architecture
//!
//! One engine is constructed per activity session and owned by the session
//! driver. It holds:
//! - The route store it reads candidates from
//! - An optional pinned route (`start_matching` / `stop_matching`)
//! - An optional auto-matched route set by the driver after a matching poll
//!
//! Every query returns `None` when data is missing instead of failing, so a
//! driver can poll on a timer without error handling.

use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::matching::score_route;
use crate::store::{RouteStatsUpdate, RouteStore};
use crate::{ActivityType, GpsPoint, MatchConfig, ProgressComparison, RouteMatch, SavedRoute};

// ============================================================================
// Route Matching Engine
// ============================================================================

/// Live route matching and PR comparison for one activity session.
pub struct RouteMatchingEngine<S: RouteStore> {
    store: S,
    config: MatchConfig,

    // Session state
    current_matched_route: Option<SavedRoute>,
    active_route: Option<SavedRoute>,
}

impl<S: RouteStore> RouteMatchingEngine<S> {
    /// Create a new engine with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, MatchConfig::default())
    }

    /// Create a new engine with custom configuration.
    pub fn with_config(store: S, config: MatchConfig) -> Self {
        Self {
            store,
            config,
            current_matched_route: None,
            active_route: None,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access for the session driver, e.g. to record a new PR.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Find the saved route the live track is most likely retracing.
    ///
    /// Requires at least `min_points` live points. Each candidate of the
    /// given activity type is scored with a forward-only cursor walk; routes
    /// below `min_match_percentage` are discarded and the highest confidence
    /// wins. Ties keep the route that comes first in store order.
    ///
    /// Pure query: session state is untouched. Use [`Self::set_matched_route`]
    /// to adopt the result.
    pub fn find_matching_route(
        &self,
        current_points: &[GpsPoint],
        activity_type: ActivityType,
    ) -> Option<RouteMatch> {
        if current_points.len() < self.config.min_points as usize {
            debug!(
                "[RouteMatchingEngine] {} points, need {} before matching",
                current_points.len(),
                self.config.min_points
            );
            return None;
        }

        let candidates = match self.store.routes_by_activity(activity_type) {
            Ok(routes) => routes,
            Err(e) => {
                warn!("[RouteMatchingEngine] Route store read failed: {}", e);
                return None;
            }
        };
        if candidates.is_empty() {
            debug!("[RouteMatchingEngine] No saved {} routes", activity_type);
            return None;
        }

        let scores = self.score_candidates(current_points, &candidates);

        let mut best: Option<RouteMatch> = None;
        for score in scores {
            debug!(
                "[RouteMatchingEngine] {} matched {}/{} points ({:.1}%)",
                score.route_id, score.matched_points, score.total_points, score.match_percentage
            );
            if score.match_percentage < self.config.min_match_percentage {
                continue;
            }
            let better = match best {
                Some(ref b) => score.confidence > b.confidence,
                None => true,
            };
            if better {
                best = Some(score);
            }
        }

        if let Some(ref m) = best {
            info!(
                "[RouteMatchingEngine] Matched route {} ({}) at {:.0}% confidence",
                m.route_id,
                m.route_name,
                m.confidence * 100.0
            );
        }
        best
    }

    #[cfg(feature = "parallel")]
    fn score_candidates(&self, current_points: &[GpsPoint], candidates: &[SavedRoute]) -> Vec<RouteMatch> {
        let config = &self.config;
        // Indexed collect keeps store order for tie-breaking
        candidates
            .par_iter()
            .map(|route| score_route(current_points, route, config))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn score_candidates(&self, current_points: &[GpsPoint], candidates: &[SavedRoute]) -> Vec<RouteMatch> {
        candidates
            .iter()
            .map(|route| score_route(current_points, route, &self.config))
            .collect()
    }

    // ========================================================================
    // PR Comparison
    // ========================================================================

    /// Compare live progress on a route with its personal record.
    ///
    /// Returns `None` when the route is unknown or has no PR. Pace values are
    /// in seconds per km. With no distance covered yet there is nothing to
    /// project from, so the estimate equals the PR and both differences are 0.
    pub fn compare_with_pr(
        &self,
        route_id: &str,
        current_distance: f64,
        current_time: f64,
    ) -> Option<ProgressComparison> {
        let route = self.lookup_route(route_id)?;
        let pr_finish_time = route.best_time?;

        let current_pace = if current_distance > 0.0 {
            current_time / (current_distance / 1000.0)
        } else {
            0.0
        };

        let percent_complete = if route.distance > 0.0 {
            (current_distance / route.distance * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let estimated_finish_time = if current_distance > 0.0 {
            route.distance / current_distance * current_time
        } else {
            pr_finish_time
        };

        let time_difference = pr_finish_time - estimated_finish_time;

        let pace_difference = match route.best_pace {
            Some(best_pace) if current_distance > 0.0 => best_pace - current_pace,
            _ => 0.0,
        };

        Some(ProgressComparison {
            is_ahead_of_pr: time_difference > 0.0,
            time_difference,
            pace_difference,
            percent_complete,
            estimated_finish_time,
            pr_finish_time,
        })
    }

    /// Build the PR update for a finished session, if it beats the route's PR.
    ///
    /// Routes without a PR accept any finished session. The store is not
    /// touched: the session driver decides whether to submit the update.
    pub fn personal_record_update(
        &self,
        route_id: &str,
        workout_id: &str,
        total_time: f64,
        total_distance: f64,
    ) -> Option<RouteStatsUpdate> {
        if total_time <= 0.0 || total_distance <= 0.0 {
            return None;
        }
        let route = self.lookup_route(route_id)?;

        let update = RouteStatsUpdate {
            workout_id: workout_id.to_string(),
            workout_time: total_time,
            workout_pace: total_time / (total_distance / 1000.0),
        };

        if update.beats(&route) {
            info!(
                "[RouteMatchingEngine] Session {} beats PR on {} ({:.0}s vs {:?})",
                workout_id, route_id, total_time, route.best_time
            );
            Some(update)
        } else {
            None
        }
    }

    fn lookup_route(&self, route_id: &str) -> Option<SavedRoute> {
        match self.store.route(route_id) {
            Ok(route) => route,
            Err(e) => {
                warn!("[RouteMatchingEngine] Route store lookup of {} failed: {}", route_id, e);
                None
            }
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Pin a route the user selected before starting. It also becomes the
    /// matched route.
    pub fn start_matching(&mut self, route: SavedRoute) {
        info!("[RouteMatchingEngine] Tracking route {} ({})", route.id, route.name);
        self.current_matched_route = Some(route.clone());
        self.active_route = Some(route);
    }

    /// Clear both the pinned and the matched route.
    pub fn stop_matching(&mut self) {
        if let Some(ref route) = self.active_route {
            info!("[RouteMatchingEngine] Stopped tracking route {}", route.id);
        }
        self.current_matched_route = None;
        self.active_route = None;
    }

    /// Replace the auto-matched route. `None` falls back to the pinned route.
    pub fn set_matched_route(&mut self, route: Option<SavedRoute>) {
        self.current_matched_route = route;
    }

    /// The auto-matched route, or the pinned route when nothing is matched.
    pub fn matched_route(&self) -> Option<&SavedRoute> {
        self.current_matched_route
            .as_ref()
            .or(self.active_route.as_ref())
    }

    pub fn active_route(&self) -> Option<&SavedRoute> {
        self.active_route.as_ref()
    }

    /// Whether a route is pinned.
    pub fn is_tracking(&self) -> bool {
        self.active_route.is_some()
    }

    /// Matched route as JSON for UI bridges. Returns "null" if none.
    pub fn matched_route_json(&self) -> String {
        serde_json::to_string(&self.matched_route()).unwrap_or_else(|_| "null".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, RoutePacerError};
    use crate::store::InMemoryRouteStore;

    fn line(start_lat: f64, lng: f64, n: usize) -> Vec<GpsPoint> {
        (0..n)
            .map(|i| GpsPoint::new(start_lat + i as f64 * 0.0002, lng))
            .collect()
    }

    fn route_with_pr(id: &str, distance: f64, best_time: f64) -> SavedRoute {
        let mut route = SavedRoute::new(id, id, ActivityType::Running, line(51.5, -0.12, 10)).unwrap();
        route.distance = distance;
        route
            .with_personal_record(best_time, best_time / (distance / 1000.0))
            .unwrap()
    }

    struct FailingStore;

    impl RouteStore for FailingStore {
        fn routes_by_activity(&self, _: ActivityType) -> Result<Vec<SavedRoute>> {
            Err(RoutePacerError::Persistence {
                message: "disk gone".to_string(),
            })
        }

        fn route(&self, _: &str) -> Result<Option<SavedRoute>> {
            Err(RoutePacerError::Persistence {
                message: "disk gone".to_string(),
            })
        }

        fn update_route_stats(&mut self, _: &str, _: &RouteStatsUpdate) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_too_few_points() {
        let coords = line(51.5, -0.12, 30);
        let route = SavedRoute::new("r1", "North", ActivityType::Running, coords.clone()).unwrap();
        let engine = RouteMatchingEngine::new(InMemoryRouteStore::from_routes(vec![route]));

        assert!(engine.find_matching_route(&coords[..9], ActivityType::Running).is_none());
        assert!(engine.find_matching_route(&coords[..10], ActivityType::Running).is_some());
    }

    #[test]
    fn test_no_candidates_for_activity() {
        let coords = line(51.5, -0.12, 30);
        let route = SavedRoute::new("r1", "North", ActivityType::Cycling, coords.clone()).unwrap();
        let engine = RouteMatchingEngine::new(InMemoryRouteStore::from_routes(vec![route]));

        assert!(engine.find_matching_route(&coords, ActivityType::Running).is_none());
    }

    #[test]
    fn test_best_route_wins() {
        let coords = line(51.5, -0.12, 30);
        // Shares only the first half with the live track
        let mut partial: Vec<GpsPoint> = coords[..15].to_vec();
        partial.extend(line(51.6, -0.2, 15));

        let store = InMemoryRouteStore::from_routes(vec![
            SavedRoute::new("partial", "Partial", ActivityType::Running, partial).unwrap(),
            SavedRoute::new("full", "Full", ActivityType::Running, coords.clone()).unwrap(),
        ]);
        let engine = RouteMatchingEngine::new(store);

        let found = engine.find_matching_route(&coords, ActivityType::Running).unwrap();
        assert_eq!(found.route_id, "full");
        assert_eq!(found.matched_points, 30);
        assert_eq!(found.confidence, 1.0);
    }

    #[test]
    fn test_tie_keeps_first_route() {
        let coords = line(51.5, -0.12, 20);
        let store = InMemoryRouteStore::from_routes(vec![
            SavedRoute::new("first", "First", ActivityType::Running, coords.clone()).unwrap(),
            SavedRoute::new("second", "Second", ActivityType::Running, coords.clone()).unwrap(),
        ]);
        let engine = RouteMatchingEngine::new(store);

        let found = engine.find_matching_route(&coords, ActivityType::Running).unwrap();
        assert_eq!(found.route_id, "first");
    }

    #[test]
    fn test_store_failure_is_treated_as_empty() {
        let engine = RouteMatchingEngine::new(FailingStore);
        let coords = line(51.5, -0.12, 20);
        assert!(engine.find_matching_route(&coords, ActivityType::Running).is_none());
        assert!(engine.compare_with_pr("r1", 100.0, 10.0).is_none());
    }

    #[test]
    fn test_compare_with_pr_on_pace() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let engine = RouteMatchingEngine::new(store);

        let cmp = engine.compare_with_pr("r1", 2500.0, 900.0).unwrap();
        assert_eq!(cmp.estimated_finish_time, 1800.0);
        assert_eq!(cmp.time_difference, 0.0);
        assert!(!cmp.is_ahead_of_pr);
        assert_eq!(cmp.percent_complete, 50.0);
        assert_eq!(cmp.pr_finish_time, 1800.0);
        assert_eq!(cmp.pace_difference, 0.0);
    }

    #[test]
    fn test_compare_with_pr_ahead_and_behind() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let engine = RouteMatchingEngine::new(store);

        let ahead = engine.compare_with_pr("r1", 2500.0, 800.0).unwrap();
        assert!(ahead.is_ahead_of_pr);
        assert!((ahead.time_difference - 200.0).abs() < 1e-9);
        // PR pace 360 s/km, current 320 s/km
        assert!((ahead.pace_difference - 40.0).abs() < 1e-9);

        let behind = engine.compare_with_pr("r1", 2500.0, 1000.0).unwrap();
        assert!(!behind.is_ahead_of_pr);
        assert!((behind.time_difference + 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_with_pr_zero_distance_is_finite() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let engine = RouteMatchingEngine::new(store);

        let cmp = engine.compare_with_pr("r1", 0.0, 30.0).unwrap();
        assert!(cmp.estimated_finish_time.is_finite());
        assert_eq!(cmp.time_difference, 0.0);
        assert_eq!(cmp.pace_difference, 0.0);
        assert_eq!(cmp.percent_complete, 0.0);
        assert!(!cmp.is_ahead_of_pr);
    }

    #[test]
    fn test_compare_with_pr_zero_time_keeps_pace_gap() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let engine = RouteMatchingEngine::new(store);

        // GPS distance arrives before the clock ticks
        let cmp = engine.compare_with_pr("r1", 20.0, 0.0).unwrap();
        assert_eq!(cmp.pace_difference, 360.0);
        assert_eq!(cmp.estimated_finish_time, 0.0);
        assert!(cmp.is_ahead_of_pr);
    }

    #[test]
    fn test_compare_with_pr_caps_percent() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let engine = RouteMatchingEngine::new(store);

        let cmp = engine.compare_with_pr("r1", 5400.0, 1900.0).unwrap();
        assert_eq!(cmp.percent_complete, 100.0);
    }

    #[test]
    fn test_compare_without_pr() {
        let route = SavedRoute::new("r1", "No PR", ActivityType::Running, line(51.5, -0.12, 5)).unwrap();
        let engine = RouteMatchingEngine::new(InMemoryRouteStore::from_routes(vec![route]));

        assert!(engine.compare_with_pr("r1", 1000.0, 300.0).is_none());
        assert!(engine.compare_with_pr("missing", 1000.0, 300.0).is_none());
    }

    #[test]
    fn test_personal_record_update() {
        let store = InMemoryRouteStore::from_routes(vec![route_with_pr("r1", 5000.0, 1800.0)]);
        let mut engine = RouteMatchingEngine::new(store);

        assert!(engine.personal_record_update("r1", "w1", 1850.0, 5000.0).is_none());
        assert!(engine.personal_record_update("r1", "w1", 1700.0, 0.0).is_none());

        let update = engine.personal_record_update("r1", "w2", 1750.0, 5000.0).unwrap();
        assert_eq!(update.workout_pace, 350.0);

        engine.store_mut().update_route_stats("r1", &update).unwrap();
        let stored = engine.store().route("r1").unwrap().unwrap();
        assert_eq!(stored.best_time, Some(1750.0));
        assert_eq!(stored.linked_workout_id.as_deref(), Some("w2"));
    }

    #[test]
    fn test_session_lifecycle() {
        let pinned = route_with_pr("pinned", 5000.0, 1800.0);
        let auto = route_with_pr("auto", 3000.0, 1000.0);
        let mut engine = RouteMatchingEngine::new(InMemoryRouteStore::new());

        assert!(!engine.is_tracking());
        assert!(engine.matched_route().is_none());
        assert_eq!(engine.matched_route_json(), "null");

        engine.start_matching(pinned.clone());
        assert!(engine.is_tracking());
        assert_eq!(engine.matched_route().unwrap().id, "pinned");

        engine.set_matched_route(Some(auto));
        assert_eq!(engine.matched_route().unwrap().id, "auto");
        assert_eq!(engine.active_route().unwrap().id, "pinned");

        engine.set_matched_route(None);
        assert_eq!(engine.matched_route().unwrap().id, "pinned");
        assert!(engine.matched_route_json().contains("\"pinned\""));

        engine.stop_matching();
        assert!(!engine.is_tracking());
        assert!(engine.matched_route().is_none());
    }
}
