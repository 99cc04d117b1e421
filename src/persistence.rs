//! # SQLite Route Store
//!
//! Durable [`RouteStore`] backed by SQLite. Route metadata lives in columns,
//! coordinates are stored as a MessagePack blob and only decoded when a
//! route is read.

use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{OptionExt, Result};
use crate::store::{apply_stats_update, RouteStatsUpdate, RouteStore};
use crate::{ActivityType, GpsPoint, SavedRoute};

const ROUTE_COLUMNS: &str = "id, name, activity_type, coordinates, distance, elevation_gain, \
     best_time, best_pace, linked_workout_id";

/// Route store persisted in a SQLite database.
pub struct SqliteRouteStore {
    db: Connection,
}

impl SqliteRouteStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Open (or create) a store at the given database path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[SqliteRouteStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Saved routes, one row per route
            CREATE TABLE IF NOT EXISTS saved_routes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                activity_type TEXT NOT NULL,
                coordinates BLOB NOT NULL,
                point_count INTEGER NOT NULL,
                distance REAL NOT NULL,
                elevation_gain REAL NOT NULL,
                best_time REAL,
                best_pace REAL,
                linked_workout_id TEXT,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_saved_routes_activity ON saved_routes(activity_type);
        "#,
        )?;
        Ok(())
    }

    // ========================================================================
    // Route Management
    // ========================================================================

    /// Insert or replace a route. The route is validated first.
    ///
    /// Replacing keeps the route's original position in store order.
    pub fn insert_route(&mut self, route: &SavedRoute) -> Result<()> {
        route.validate()?;
        let coordinates = rmp_serde::to_vec(&route.coordinates)?;

        self.db.execute(
            "INSERT INTO saved_routes
                (id, name, activity_type, coordinates, point_count, distance, elevation_gain,
                 best_time, best_pace, linked_workout_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                activity_type = excluded.activity_type,
                coordinates = excluded.coordinates,
                point_count = excluded.point_count,
                distance = excluded.distance,
                elevation_gain = excluded.elevation_gain,
                best_time = excluded.best_time,
                best_pace = excluded.best_pace,
                linked_workout_id = excluded.linked_workout_id",
            params![
                route.id,
                route.name,
                route.activity_type.as_str(),
                coordinates,
                route.coordinates.len() as i64,
                route.distance,
                route.elevation_gain,
                route.best_time,
                route.best_pace,
                route.linked_workout_id,
            ],
        )?;
        debug!(
            "[SqliteRouteStore] Stored route {} ({} points)",
            route.id,
            route.coordinates.len()
        );
        Ok(())
    }

    /// Remove a route. Returns whether a row was deleted.
    pub fn remove_route(&mut self, route_id: &str) -> Result<bool> {
        let deleted = self
            .db
            .execute("DELETE FROM saved_routes WHERE id = ?", params![route_id])?;
        Ok(deleted > 0)
    }

    /// Number of stored routes.
    pub fn route_count(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM saved_routes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn write_stats(&self, route: &SavedRoute) -> Result<()> {
        self.db.execute(
            "UPDATE saved_routes SET best_time = ?, best_pace = ?, linked_workout_id = ? WHERE id = ?",
            params![route.best_time, route.best_pace, route.linked_workout_id, route.id],
        )?;
        Ok(())
    }
}

/// Raw row values; the blob and activity type are decoded outside the
/// rusqlite closure so decode errors map onto our error type.
struct RouteRow {
    id: String,
    name: String,
    activity_type: String,
    coordinates: Vec<u8>,
    distance: f64,
    elevation_gain: f64,
    best_time: Option<f64>,
    best_pace: Option<f64>,
    linked_workout_id: Option<String>,
}

impl RouteRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            activity_type: row.get(2)?,
            coordinates: row.get(3)?,
            distance: row.get(4)?,
            elevation_gain: row.get(5)?,
            best_time: row.get(6)?,
            best_pace: row.get(7)?,
            linked_workout_id: row.get(8)?,
        })
    }

    fn into_route(self) -> Result<SavedRoute> {
        let coordinates: Vec<GpsPoint> = rmp_serde::from_slice(&self.coordinates)?;
        Ok(SavedRoute {
            id: self.id,
            name: self.name,
            activity_type: self.activity_type.parse()?,
            coordinates,
            distance: self.distance,
            elevation_gain: self.elevation_gain,
            best_time: self.best_time,
            best_pace: self.best_pace,
            linked_workout_id: self.linked_workout_id,
        })
    }
}

impl RouteStore for SqliteRouteStore {
    fn routes_by_activity(&self, activity_type: ActivityType) -> Result<Vec<SavedRoute>> {
        let mut stmt = self.db.prepare(&format!(
            "SELECT {} FROM saved_routes WHERE activity_type = ? ORDER BY rowid",
            ROUTE_COLUMNS
        ))?;

        let rows: Vec<RouteRow> = stmt
            .query_map(params![activity_type.as_str()], RouteRow::from_row)?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter().map(RouteRow::into_route).collect()
    }

    fn route(&self, route_id: &str) -> Result<Option<SavedRoute>> {
        let row = self
            .db
            .query_row(
                &format!("SELECT {} FROM saved_routes WHERE id = ?", ROUTE_COLUMNS),
                params![route_id],
                RouteRow::from_row,
            )
            .optional()?;

        row.map(RouteRow::into_route).transpose()
    }

    fn update_route_stats(&mut self, route_id: &str, update: &RouteStatsUpdate) -> Result<()> {
        let mut route = self.route(route_id)?.ok_or_route_not_found(route_id)?;
        if apply_stats_update(&mut route, update) {
            self.write_stats(&route)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoutePacerError;

    fn sample_coords(offset: f64) -> Vec<GpsPoint> {
        (0..50)
            .map(|i| {
                GpsPoint::new(51.5074 + offset + i as f64 * 0.001, -0.1278 + i as f64 * 0.0005)
                    .with_altitude(20.0 + i as f64)
            })
            .collect()
    }

    fn sample_route(id: &str, activity_type: ActivityType) -> SavedRoute {
        SavedRoute::new(id, &format!("Route {}", id), activity_type, sample_coords(0.0)).unwrap()
    }

    #[test]
    fn test_create_store() {
        let store = SqliteRouteStore::in_memory().unwrap();
        assert_eq!(store.route_count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut store = SqliteRouteStore::in_memory().unwrap();
        let route = sample_route("a", ActivityType::Hiking)
            .with_personal_record(3600.0, 600.0)
            .unwrap();
        store.insert_route(&route).unwrap();

        let loaded = store.route("a").unwrap().unwrap();
        assert_eq!(loaded, route);
        assert!(store.route("missing").unwrap().is_none());
    }

    #[test]
    fn test_routes_by_activity_in_insertion_order() {
        let mut store = SqliteRouteStore::in_memory().unwrap();
        store.insert_route(&sample_route("z", ActivityType::Running)).unwrap();
        store.insert_route(&sample_route("b", ActivityType::Cycling)).unwrap();
        store.insert_route(&sample_route("a", ActivityType::Running)).unwrap();

        let ids: Vec<String> = store
            .routes_by_activity(ActivityType::Running)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_insert_rejects_invalid_route() {
        let mut store = SqliteRouteStore::in_memory().unwrap();
        let mut route = sample_route("a", ActivityType::Running);
        route.coordinates.clear();
        assert!(matches!(
            store.insert_route(&route),
            Err(RoutePacerError::InvalidRoute { .. })
        ));
    }

    #[test]
    fn test_update_route_stats() {
        let mut store = SqliteRouteStore::in_memory().unwrap();
        store.insert_route(&sample_route("a", ActivityType::Running)).unwrap();

        let update = RouteStatsUpdate {
            workout_id: "w1".to_string(),
            workout_time: 1500.0,
            workout_pace: 300.0,
        };
        store.update_route_stats("a", &update).unwrap();

        let loaded = store.route("a").unwrap().unwrap();
        assert_eq!(loaded.best_time, Some(1500.0));
        assert_eq!(loaded.best_pace, Some(300.0));
        assert_eq!(loaded.linked_workout_id.as_deref(), Some("w1"));

        assert!(matches!(
            store.update_route_stats("missing", &update),
            Err(RoutePacerError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_route() {
        let mut store = SqliteRouteStore::in_memory().unwrap();
        store.insert_route(&sample_route("a", ActivityType::Running)).unwrap();
        assert!(store.remove_route("a").unwrap());
        assert!(!store.remove_route("a").unwrap());
        assert_eq!(store.route_count().unwrap(), 0);
    }
}
