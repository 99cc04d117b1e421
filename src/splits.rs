//! Per-kilometer split tracking and pace statistics.
//!
//! A [`SplitTracker`] is fed cumulative distance and elapsed time by the
//! session driver and emits a [`Split`] each time a kilometer boundary is
//! crossed. Statistics are derived on demand from the recorded splits.
//!
//! ## Example
//! ```rust
//! use route_pacer::SplitTracker;
//!
//! let mut tracker = SplitTracker::new();
//! tracker.start(0);
//! assert!(tracker.update(950.0, 290.0, 0).is_none());
//! let split = tracker.update(1005.0, 305.0, 0).unwrap();
//! assert_eq!(split.number, 1);
//! assert_eq!(split.pace, 305.0);
//! ```

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Consistency, Split, SplitComparison, SplitConfig, SplitStatistics};

/// Split length in meters.
pub const SPLIT_INTERVAL_METERS: f64 = 1000.0;

/// Position within the split currently being run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SplitProgress {
    /// 1-based number of the split in progress
    pub current_split_number: u32,
    /// Meters covered within the current split
    pub progress_meters: f64,
    /// 0 - 100
    pub progress_percent: f64,
}

/// Tracks kilometer splits for one activity session.
#[derive(Debug, Clone)]
pub struct SplitTracker {
    splits: Vec<Split>,
    last_split_distance: f64,
    /// Elapsed time seen with `last_split_distance`, for back-filling
    last_elapsed: f64,
    paused_duration_seconds: f64,
    start_time: Option<i64>,
    config: SplitConfig,
}

impl Default for SplitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitTracker {
    /// Create a tracker with default statistics configuration.
    pub fn new() -> Self {
        Self::with_config(SplitConfig::default())
    }

    pub fn with_config(config: SplitConfig) -> Self {
        Self {
            splits: Vec::new(),
            last_split_distance: 0.0,
            last_elapsed: 0.0,
            paused_duration_seconds: 0.0,
            start_time: None,
            config,
        }
    }

    /// Begin a new session, discarding any previous splits.
    ///
    /// `start_time` is a Unix timestamp in milliseconds.
    pub fn start(&mut self, start_time: i64) {
        self.splits.clear();
        self.last_split_distance = 0.0;
        self.last_elapsed = 0.0;
        self.paused_duration_seconds = 0.0;
        self.start_time = Some(start_time);
    }

    /// Feed the latest cumulative distance (m) and elapsed time (s).
    ///
    /// Emits at most one split per call, numbered after the kilometer the
    /// runner is in now. If a coarse poll skips a whole kilometer the skipped
    /// split is merged into the emitted one; use
    /// [`Self::update_with_backfill`] to get every boundary.
    ///
    /// Distances lower than the previous one are ignored.
    pub fn update(
        &mut self,
        current_distance: f64,
        current_elapsed: f64,
        paused_duration_ms: u64,
    ) -> Option<Split> {
        if !self.accept(current_distance, paused_duration_ms) {
            return None;
        }

        let current_km = (current_distance / SPLIT_INTERVAL_METERS).floor() as u32;
        let last_km = (self.last_split_distance / SPLIT_INTERVAL_METERS).floor() as u32;

        let split = if current_km > last_km && current_km > 0 {
            Some(self.record_split(current_km, current_elapsed, Utc::now().timestamp_millis()))
        } else {
            None
        };

        self.last_split_distance = current_distance;
        self.last_elapsed = current_elapsed;
        split
    }

    /// Like [`Self::update`], but emits one split for every kilometer
    /// boundary crossed since the previous call.
    ///
    /// Skipped boundaries get an elapsed time interpolated linearly between
    /// the previous and current samples; the last boundary uses the current
    /// elapsed time, same as `update`.
    pub fn update_with_backfill(
        &mut self,
        current_distance: f64,
        current_elapsed: f64,
        paused_duration_ms: u64,
    ) -> Vec<Split> {
        if !self.accept(current_distance, paused_duration_ms) {
            return Vec::new();
        }

        let current_km = (current_distance / SPLIT_INTERVAL_METERS).floor() as u32;
        let last_km = (self.last_split_distance / SPLIT_INTERVAL_METERS).floor() as u32;
        let now = Utc::now().timestamp_millis();

        let mut emitted = Vec::new();
        if current_km > last_km {
            let covered = current_distance - self.last_split_distance;
            for km in (last_km + 1)..=current_km {
                let elapsed = if km == current_km {
                    current_elapsed
                } else {
                    let boundary = km as f64 * SPLIT_INTERVAL_METERS;
                    let fraction = (boundary - self.last_split_distance) / covered;
                    self.last_elapsed + fraction * (current_elapsed - self.last_elapsed)
                };
                emitted.push(self.record_split(km, elapsed, now));
            }
            debug!(
                "[SplitTracker] Crossed {} boundaries up to km {}",
                emitted.len(),
                current_km
            );
        }

        self.last_split_distance = current_distance;
        self.last_elapsed = current_elapsed;
        emitted
    }

    fn accept(&mut self, current_distance: f64, paused_duration_ms: u64) -> bool {
        self.paused_duration_seconds = (paused_duration_ms / 1000) as f64;

        if !current_distance.is_finite() || current_distance < self.last_split_distance {
            debug!(
                "[SplitTracker] Ignoring distance {} (last {})",
                current_distance, self.last_split_distance
            );
            return false;
        }
        true
    }

    fn record_split(&mut self, km: u32, elapsed: f64, timestamp: i64) -> Split {
        let previous_elapsed = self.splits.last().map(|s| s.elapsed_time).unwrap_or(0.0);
        let split_time = elapsed - previous_elapsed;

        // Each split covers exactly one kilometer, so split time is the pace
        let split = Split {
            number: km,
            distance_km: km,
            elapsed_time: elapsed,
            split_time,
            pace: split_time,
            timestamp,
        };
        debug!(
            "[SplitTracker] Split {} in {:.0}s (elapsed {:.0}s)",
            split.number, split.split_time, split.elapsed_time
        );
        self.splits.push(split.clone());
        split
    }

    /// Where the runner is within the current split. Pure.
    pub fn current_split_progress(&self, current_distance: f64) -> SplitProgress {
        let distance = current_distance.max(0.0);
        let current_km = (distance / SPLIT_INTERVAL_METERS).floor();
        let progress_meters = distance - current_km * SPLIT_INTERVAL_METERS;

        SplitProgress {
            current_split_number: current_km as u32 + 1,
            progress_meters,
            progress_percent: progress_meters / SPLIT_INTERVAL_METERS * 100.0,
        }
    }

    /// Aggregate statistics over the recorded splits, `None` before the first split.
    pub fn statistics(&self) -> Option<SplitStatistics> {
        if self.splits.is_empty() {
            return None;
        }

        let paces: Vec<f64> = self.splits.iter().map(|s| s.pace).collect();
        let average_pace =
            self.splits.iter().map(|s| s.split_time).sum::<f64>() / self.splits.len() as f64;

        // First split wins ties in both directions
        let mut fastest = &self.splits[0];
        let mut slowest = &self.splits[0];
        for split in &self.splits[1..] {
            if split.pace < fastest.pace {
                fastest = split;
            }
            if split.pace > slowest.pace {
                slowest = split;
            }
        }

        let is_negative_split = if self.splits.len() >= self.config.negative_split_min_splits as usize {
            let mid = paces.len() / 2;
            mean(&paces[mid..]) < mean(&paces[..mid])
        } else {
            false
        };

        let variance = population_variance(&paces);
        let consistency = if variance < self.config.excellent_variance {
            Consistency::Excellent
        } else if variance < self.config.good_variance {
            Consistency::Good
        } else {
            Consistency::Variable
        };

        Some(SplitStatistics {
            average_pace,
            fastest_split: Some(fastest.clone()),
            slowest_split: Some(slowest.clone()),
            is_negative_split,
            consistency,
        })
    }

    /// Compare a split's pace with the session average, within a deadband.
    pub fn compare_split_to_average(&self, split: &Split) -> SplitComparison {
        let Some(stats) = self.statistics() else {
            return SplitComparison::Average;
        };

        let deadband = self.config.average_deadband_seconds;
        if split.pace < stats.average_pace - deadband {
            SplitComparison::Faster
        } else if split.pace > stats.average_pace + deadband {
            SplitComparison::Slower
        } else {
            SplitComparison::Average
        }
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn last_split(&self) -> Option<&Split> {
        self.splits.last()
    }

    pub fn paused_duration_seconds(&self) -> f64 {
        self.paused_duration_seconds
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    /// Recorded splits as JSON for UI bridges.
    pub fn splits_json(&self) -> String {
        serde_json::to_string(&self.splits).unwrap_or_else(|_| "[]".to_string())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    mean(&values.iter().map(|v| (v - m).powi(2)).collect::<Vec<_>>())
}

// ============================================================================
// Tests
// ============================================================================
