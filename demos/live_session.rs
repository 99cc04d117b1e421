//! Simulated live session: auto-detect a saved route, then pace against its PR
//! while recording kilometer splits.
//!
//! Run with `RUST_LOG=debug cargo run --example live_session` for engine logs.

use route_pacer::{
    ActivityType, GpsPoint, InMemoryRouteStore, LiveTrack, PositionSource, RouteMatchingEngine,
    RouteStore, SavedRoute, SplitTracker,
};

fn main() {
    env_logger::init();

    // A 3km out-and-back along a straight path
    let out: Vec<GpsPoint> = (0..=30)
        .map(|i| GpsPoint::new(46.2000 + i as f64 * 0.000449, 6.1500))
        .collect();
    let mut coords = out.clone();
    coords.extend(out.iter().rev().skip(1).copied());

    let route = SavedRoute::new("promenade", "Promenade 3k", ActivityType::Running, coords.clone())
        .and_then(|r| r.with_personal_record(900.0, 300.0))
        .expect("valid demo route");

    let mut engine = RouteMatchingEngine::new(InMemoryRouteStore::from_routes(vec![route]));
    let mut splits = SplitTracker::new();
    splits.start(chrono::Utc::now().timestamp_millis());

    let mut track = LiveTrack::new();
    let mut matched_id: Option<String> = None;

    // Runner holds 290 s/km
    for p in &coords {
        track.push(GpsPoint::new(p.latitude, p.longitude + 0.0001));
        let distance = track.distance();
        let elapsed = distance / 1000.0 * 290.0;

        if let Some(split) = splits.update(distance, elapsed, 0) {
            println!("km {}: {:.0}s", split.number, split.split_time);
        }

        if matched_id.is_none() {
            if let Some(m) = engine.find_matching_route(&track.current_positions(), ActivityType::Running) {
                println!("Matched {} ({:.0}% confidence)", m.route_name, m.confidence * 100.0);
                let route = engine.store().routes().iter().find(|r| r.id == m.route_id).cloned();
                engine.set_matched_route(route);
                matched_id = Some(m.route_id);
            }
        }

        if let Some(ref id) = matched_id {
            if let Some(cmp) = engine.compare_with_pr(id, distance, elapsed) {
                if track.len() % 10 == 0 {
                    println!(
                        "{:.0}% done, projected {:.0}s vs PR {:.0}s ({})",
                        cmp.percent_complete,
                        cmp.estimated_finish_time,
                        cmp.pr_finish_time,
                        if cmp.is_ahead_of_pr { "ahead" } else { "behind" }
                    );
                }
            }
        }
    }

    if let Some(stats) = splits.statistics() {
        println!(
            "Average {:.0}s/km, negative split: {}, consistency: {:?}",
            stats.average_pace, stats.is_negative_split, stats.consistency
        );
    }

    let total_distance = track.distance();
    let total_time = total_distance / 1000.0 * 290.0;
    if let Some(update) = engine.personal_record_update("promenade", "demo-run", total_time, total_distance) {
        engine
            .store_mut()
            .update_route_stats("promenade", &update)
            .expect("route exists");
        println!("New PR: {:.0}s", update.workout_time);
    }
}
