//! On-disk route store tests (requires the `persistence` feature).

use route_pacer::{
    ActivityType, GpsPoint, RouteMatchingEngine, RouteStore, SavedRoute, SqliteRouteStore,
};
use tempfile::TempDir;

fn loop_route(id: &str) -> SavedRoute {
    let coords: Vec<GpsPoint> = (0..60)
        .map(|i| {
            let angle = i as f64 / 60.0 * std::f64::consts::TAU;
            GpsPoint::new(45.0 + 0.004 * angle.sin(), 7.0 + 0.006 * angle.cos())
        })
        .collect();
    SavedRoute::new(id, "Park loop", ActivityType::Running, coords).unwrap()
}

#[test]
fn test_routes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.db");
    let path = path.to_str().unwrap();

    {
        let mut store = SqliteRouteStore::new(path).unwrap();
        store
            .insert_route(&loop_route("park").with_personal_record(1500.0, 400.0).unwrap())
            .unwrap();
    }

    let store = SqliteRouteStore::new(path).unwrap();
    assert_eq!(store.route_count().unwrap(), 1);
    let route = store.route("park").unwrap().unwrap();
    assert_eq!(route.coordinates.len(), 60);
    assert_eq!(route.best_time, Some(1500.0));
}

#[test]
fn test_engine_over_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("routes.db");

    let mut store = SqliteRouteStore::new(path.to_str().unwrap()).unwrap();
    let route = loop_route("park").with_personal_record(1500.0, 400.0).unwrap();
    let live: Vec<GpsPoint> = route.coordinates[..20].to_vec();
    store.insert_route(&route).unwrap();

    let mut engine = RouteMatchingEngine::new(store);
    let found = engine.find_matching_route(&live, ActivityType::Running).unwrap();
    assert_eq!(found.route_id, "park");

    let update = engine
        .personal_record_update("park", "w-42", 1400.0, route.distance)
        .unwrap();
    engine.store_mut().update_route_stats("park", &update).unwrap();

    let cmp = engine
        .compare_with_pr("park", route.distance / 2.0, 650.0)
        .unwrap();
    assert_eq!(cmp.pr_finish_time, 1400.0);
    assert!(cmp.is_ahead_of_pr);
}
