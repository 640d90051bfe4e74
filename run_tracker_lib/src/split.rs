use serde::{Deserialize, Serialize};

/// Per-unit-distance summary derived from a run's aggregates. Never
/// persisted, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub number: u32,
    pub distance_km: f64,
    pub duration_seconds: i64,
    pub pace_min_per_km: f64,
    pub calories: i32,
}
