pub const RUNS_TABLE_NAME: &str = "Runs";
pub const RUN_ID: &str = "run_id";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const DISTANCE_KM: &str = "distance_km";
pub const DURATION_SECONDS: &str = "duration_seconds";
pub const AVG_PACE_PER_KM: &str = "avg_pace_per_km";
pub const CALORIES_BURNED: &str = "calories_burned";
pub const MAX_PACE_PER_KM: &str = "max_pace_per_km";
pub const MIN_PACE_PER_KM: &str = "min_pace_per_km";
pub const MAX_SPEED_KMPH: &str = "max_speed_kmph";
pub const PATH: &str = "path";
pub const COMPLETED: &str = "completed";
