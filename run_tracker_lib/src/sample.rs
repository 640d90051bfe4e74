use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// One GPS fix as delivered by the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    pub position: Point,
    pub speed_kmph: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GeoSample {
    pub fn new(position: Point, speed_kmph: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            speed_kmph,
            timestamp,
        }
    }

    /// Device-reported speed, filtered to positive values.
    pub fn reported_speed_kmph(&self) -> Option<f64> {
        self.speed_kmph.filter(|speed| *speed > 0.0)
    }
}
