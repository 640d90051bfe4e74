use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use super::sample::GeoSample;

/// Durable record of a completed session. Immutable once stored, except for
/// deletion.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Run {
    pub run_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub distance_km: f64,
    pub duration_seconds: i64,
    pub avg_pace_per_km: f64,
    pub calories_burned: i32,
    pub max_pace_per_km: f64,
    pub min_pace_per_km: f64,
    pub max_speed_kmph: f64,
    pub path: Vec<GeoSample>,
    pub completed: bool,
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for Run {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let path_blob: Vec<u8> = row.get(10);
        let path = if path_blob.is_empty() {
            Vec::new()
        } else {
            bincode::deserialize::<Vec<GeoSample>>(&path_blob).unwrap()
        };

        Ok(Self {
            run_id: row.get(0),
            start_time: row.get(1),
            end_time: row.get(2),
            distance_km: row.get(3),
            duration_seconds: row.get(4),
            avg_pace_per_km: row.get(5),
            calories_burned: row.get(6),
            max_pace_per_km: row.get(7),
            min_pace_per_km: row.get(8),
            max_speed_kmph: row.get(9),
            path,
            completed: row.get(11),
        })
    }
}

impl Run {
    /// A freshly finished run. `run_id` is -1 until the store assigns one.
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        distance_km: f64,
        duration_seconds: i64,
        avg_pace_per_km: f64,
        calories_burned: i32,
        max_pace_per_km: f64,
        min_pace_per_km: f64,
        max_speed_kmph: f64,
        path: Vec<GeoSample>,
    ) -> Self {
        Self {
            run_id: -1,
            start_time,
            end_time,
            distance_km,
            duration_seconds,
            avg_pace_per_km,
            calories_burned,
            max_pace_per_km,
            min_pace_per_km,
            max_speed_kmph,
            path,
            completed: true,
        }
    }

    pub fn get_path_blob(&self) -> Vec<u8> {
        bincode::serialize(&self.path).unwrap()
    }
}
