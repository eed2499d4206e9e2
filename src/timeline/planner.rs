use serde::{Deserialize, Serialize};

pub const TARGET_PIXELS_PER_TICK: f64 = 80.0;

/// Candidate tick intervals in seconds, ascending.
pub const TICK_LADDER_SECONDS: [f64; 19] = [
    0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0,
    600.0, 900.0, 1800.0, 3600.0,
];

const SECONDARY_LABEL_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineIntervalPlan {
    pub tick_interval_seconds: f64,
    pub primary_label_interval_seconds: f64,
    pub secondary_label_interval_seconds: f64,
}

impl TimelineIntervalPlan {
    fn from_interval(interval: f64) -> Self {
        Self {
            tick_interval_seconds: interval,
            primary_label_interval_seconds: interval,
            secondary_label_interval_seconds: interval * SECONDARY_LABEL_FACTOR,
        }
    }
}

pub fn max_ticks(available_width_px: f64) -> u64 {
    let ticks = (available_width_px / TARGET_PIXELS_PER_TICK).floor();
    if ticks.is_finite() && ticks >= 1.0 {
        ticks as u64
    } else {
        1
    }
}

/// Smallest ladder interval whose tick count fits the width; the largest rung
/// when nothing fits.
pub fn plan(duration_seconds: f64, available_width_px: f64) -> TimelineIntervalPlan {
    let duration = if duration_seconds.is_finite() && duration_seconds > 0.0 {
        duration_seconds
    } else {
        0.0
    };
    let max_ticks = max_ticks(available_width_px) as f64;

    let interval = TICK_LADDER_SECONDS
        .iter()
        .copied()
        .find(|interval| (duration / interval).ceil() <= max_ticks)
        .unwrap_or(TICK_LADDER_SECONDS[TICK_LADDER_SECONDS.len() - 1]);

    TimelineIntervalPlan::from_interval(interval)
}
