//! Point-to-route matching for live tracks.
//!
//! A live point is "on" a route when it lies within the match distance of any
//! recorded route point. The search first looks at a small index window
//! around where the runner is expected to be, then falls back to a full
//! nearest-point scan. The window is only a shortcut: the fallback always
//! runs when the window misses, so results never depend on it.

use crate::geo_utils::haversine_distance;
use crate::{Bounds, GpsPoint, MatchConfig, RouteMatch, SavedRoute};

/// Nearest route point to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// Distance in meters
    pub distance: f64,
    /// Index into the route's point sequence
    pub index: usize,
}

/// Find the closest route point by exhaustive scan.
///
/// Returns `None` for an empty route. Ties keep the lowest index.
pub fn find_closest_point(point: &GpsPoint, route_points: &[GpsPoint]) -> Option<ClosestPoint> {
    route_points
        .iter()
        .enumerate()
        .map(|(index, rp)| ClosestPoint {
            distance: haversine_distance(point, rp),
            index,
        })
        .fold(None, |best: Option<ClosestPoint>, candidate| match best {
            Some(b) if b.distance <= candidate.distance => Some(b),
            _ => Some(candidate),
        })
}

/// Check whether a point lies on a route using the default 50m threshold.
///
/// # Example
/// ```
/// use route_pacer::{GpsPoint, is_on_route};
///
/// let route = vec![GpsPoint::new(51.5074, -0.1278), GpsPoint::new(51.5080, -0.1290)];
/// assert!(is_on_route(&GpsPoint::new(51.5075, -0.1279), &route, Some(0)));
/// assert!(!is_on_route(&GpsPoint::new(51.5200, -0.1278), &route, None));
/// ```
pub fn is_on_route(point: &GpsPoint, route_points: &[GpsPoint], expected_index: Option<usize>) -> bool {
    is_on_route_with_config(point, route_points, expected_index, &MatchConfig::default())
}

/// Check whether a point lies on a route with an explicit configuration.
pub fn is_on_route_with_config(
    point: &GpsPoint,
    route_points: &[GpsPoint],
    expected_index: Option<usize>,
    config: &MatchConfig,
) -> bool {
    if route_points.is_empty() {
        return false;
    }

    if let Some(expected) = expected_index.filter(|&i| i < route_points.len()) {
        let window = config.search_window as usize;
        let start = expected.saturating_sub(window);
        let end = (expected + window).min(route_points.len() - 1);

        let hit = route_points[start..=end]
            .iter()
            .any(|rp| haversine_distance(point, rp) <= config.match_distance_meters);
        if hit {
            return true;
        }
    }

    find_closest_point(point, route_points)
        .map(|closest| closest.distance <= config.match_distance_meters)
        .unwrap_or(false)
}

/// Score one route against a live track.
///
/// Walks the live points in order with a forward-only cursor into the
/// route: every matched point advances the cursor by one, capped at the last
/// route index. The qualification gate (minimum match percentage) is left to
/// the caller.
pub fn score_route(current_points: &[GpsPoint], route: &SavedRoute, config: &MatchConfig) -> RouteMatch {
    let route_points = &route.coordinates;
    let total = current_points.len();

    let mut matched_count: usize = 0;

    if !route_points.is_empty() {
        // Points well outside the route's envelope cannot be within the threshold
        let envelope = Bounds::from_points(route_points);
        let margin = config.match_distance_meters * 2.0;
        let last_index = route_points.len() - 1;
        let mut expected_index = 0usize;

        for point in current_points {
            if let Some(ref env) = envelope {
                if !env.contains_with_margin(point, margin) {
                    continue;
                }
            }
            if is_on_route_with_config(point, route_points, Some(expected_index), config) {
                matched_count += 1;
                expected_index = (expected_index + 1).min(last_index);
            }
        }
    }

    let match_percentage = if total > 0 {
        matched_count as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    RouteMatch {
        route_id: route.id.clone(),
        route_name: route.name.clone(),
        confidence: (match_percentage / 100.0).min(1.0),
        matched_points: matched_count as u32,
        total_points: total as u32,
        match_percentage,
    }
}
