//! Integration tests for split tracking.

use route_pacer::{Consistency, SplitComparison, SplitTracker};

#[test]
fn test_exact_boundaries_emit_three_splits() {
    let mut tracker = SplitTracker::new();
    tracker.start(0);

    let samples = [
        (400.0, 120.0),
        (999.0, 299.0),
        (1000.0, 300.0),
        (1500.0, 455.0),
        (2000.0, 610.0),
        (2999.0, 905.0),
        (3000.0, 906.0),
        (3400.0, 1030.0),
    ];
    let emitted: Vec<_> = samples
        .iter()
        .filter_map(|&(d, t)| tracker.update(d, t, 0))
        .collect();

    assert_eq!(emitted.len(), 3);
    assert_eq!(
        emitted.iter().map(|s| s.number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(
        emitted.iter().map(|s| s.split_time).collect::<Vec<_>>(),
        vec![300.0, 310.0, 296.0]
    );
    assert!(emitted.windows(2).all(|w| w[1].elapsed_time > w[0].elapsed_time));
    assert!(emitted.iter().all(|s| s.timestamp > 0));
}

#[test]
fn test_split_progress_round_trip() {
    let tracker = SplitTracker::new();
    let progress = tracker.current_split_progress(2500.0);
    assert_eq!(progress.current_split_number, 3);
    assert_eq!(progress.progress_meters, 500.0);
    assert_eq!(progress.progress_percent, 50.0);
}

#[test]
fn test_session_statistics() {
    let mut tracker = SplitTracker::new();
    tracker.start(0);
    assert!(tracker.statistics().is_none());

    // 330, 320, 300, 290 s/km: faster second half
    let mut elapsed = 0.0;
    for (km, pace) in [330.0, 320.0, 300.0, 290.0].iter().enumerate() {
        elapsed += pace;
        tracker.update((km + 1) as f64 * 1000.0 + 3.0, elapsed, 0);
    }

    let stats = tracker.statistics().unwrap();
    assert!((stats.average_pace - 310.0).abs() < 1e-9);
    assert!(stats.is_negative_split);
    assert_eq!(stats.fastest_split.as_ref().unwrap().number, 4);
    assert_eq!(stats.slowest_split.as_ref().unwrap().number, 1);
    // Variance 250
    assert_eq!(stats.consistency, Consistency::Good);

    let splits = tracker.splits().to_vec();
    assert_eq!(tracker.compare_split_to_average(&splits[0]), SplitComparison::Slower);
    assert_eq!(tracker.compare_split_to_average(&splits[3]), SplitComparison::Faster);
}

#[test]
fn test_coarse_polling_with_backfill() {
    let mut tracker = SplitTracker::new();
    tracker.start(0);

    let mut numbers = Vec::new();
    for (d, t) in [(800.0, 240.0), (3200.0, 960.0), (4100.0, 1230.0)] {
        numbers.extend(tracker.update_with_backfill(d, t, 0).into_iter().map(|s| s.number));
    }
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    let splits = tracker.splits();
    assert!(splits.windows(2).all(|w| w[1].elapsed_time > w[0].elapsed_time));
    // 800m -> 3200m over 720s is a steady 300 s/km
    assert!((splits[0].split_time - 300.0).abs() < 1e-6);
    assert!((splits[1].split_time - 300.0).abs() < 1e-6);
}
