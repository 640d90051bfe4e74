use chrono::{DateTime, Utc};
use run_tracker_lib::{metrics, run::Run, sample::GeoSample};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackingState {
    #[default]
    Idle,
    Active,
    Paused,
}

/// Live session state as published to observers after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: TrackingState,
    pub distance_km: f64,
    pub duration_seconds: i64,
    pub current_pace: f64,
    pub avg_pace: f64,
    pub calories: i32,
    pub max_speed_kmph: f64,
    pub path: Vec<GeoSample>,
}

/// In-memory state of one run while it is being tracked.
///
/// Purely sequential: the owning service task applies one event at a time,
/// so sample ingestion and duration ticks never interleave mid-update.
pub struct TrackingSession {
    state: TrackingState,
    start_time: Option<DateTime<Utc>>,
    distance_km: f64,
    duration_seconds: i64,
    current_pace: f64,
    avg_pace: f64,
    calories: i32,
    max_speed_kmph: f64,
    // Pace extremes over instantaneous readings, 0.0 until first observed
    max_pace_per_km: f64,
    min_pace_per_km: f64,
    path: Vec<GeoSample>,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self {
            state: TrackingState::Idle,
            start_time: None,
            distance_km: 0.0,
            duration_seconds: 0,
            current_pace: 0.0,
            avg_pace: 0.0,
            calories: 0,
            max_speed_kmph: 0.0,
            max_pace_per_km: 0.0,
            min_pace_per_km: 0.0,
            path: Vec::new(),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration_seconds
    }

    pub fn path(&self) -> &[GeoSample] {
        &self.path
    }

    /// Begins tracking. Accumulators are only reset when starting fresh,
    /// with zero accumulated duration.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.duration_seconds == 0 {
            self.distance_km = 0.0;
            self.calories = 0;
            self.path.clear();
        }

        self.start_time = Some(now);
        self.state = TrackingState::Active;
    }

    pub fn pause(&mut self) {
        if self.state == TrackingState::Active {
            self.state = TrackingState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TrackingState::Paused {
            self.state = TrackingState::Active;
        }
    }

    /// One-second duration refresh. Only time spent Active counts, pausing
    /// suspends the clock.
    pub fn tick(&mut self) {
        if self.state != TrackingState::Active {
            return;
        }

        self.duration_seconds += 1;

        if let Some(avg_pace) = metrics::average_pace(self.distance_km, self.duration_seconds) {
            self.avg_pace = avg_pace;
            self.calories = metrics::calculate_calories(self.distance_km);
        }
    }

    /// Applies one location sample. Ignored unless Active, samples arriving
    /// while Paused must not touch distance or the path.
    pub fn ingest(&mut self, sample: GeoSample) {
        if self.state != TrackingState::Active {
            return;
        }

        if let Some(previous) = self.path.last() {
            let delta_km = metrics::haversine_km(previous.position, sample.position);
            self.distance_km += delta_km;

            let speed_kmph = sample.reported_speed_kmph().or_else(|| {
                let delta_seconds = (sample.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0;
                if delta_km > 0.0 && delta_seconds > 0.0 {
                    Some(delta_km / (delta_seconds / 3600.0))
                } else {
                    None
                }
            });

            if let Some(speed_kmph) = speed_kmph {
                if speed_kmph > self.max_speed_kmph {
                    self.max_speed_kmph = speed_kmph;
                }

                if let Some(pace) = metrics::speed_to_pace(speed_kmph) {
                    self.current_pace = pace;
                    if pace > self.max_pace_per_km {
                        self.max_pace_per_km = pace;
                    }
                    if self.min_pace_per_km == 0.0 || pace < self.min_pace_per_km {
                        self.min_pace_per_km = pace;
                    }
                }
            }
        }

        self.path.push(sample);
    }

    /// Ends the session. Returns the finished run when anything was
    /// accumulated, an untouched session produces no record. All
    /// accumulators are reset either way.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Run> {
        if self.state == TrackingState::Idle {
            return None;
        }
        self.state = TrackingState::Idle;

        let run = match self.start_time {
            Some(start_time) if self.distance_km > 0.0 || self.duration_seconds > 0 => Some(Run::new(
                start_time,
                Some(now),
                self.distance_km,
                self.duration_seconds,
                self.avg_pace,
                self.calories,
                self.max_pace_per_km,
                self.min_pace_per_km,
                self.max_speed_kmph,
                std::mem::take(&mut self.path),
            )),
            _ => None,
        };

        self.reset();

        run
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            distance_km: self.distance_km,
            duration_seconds: self.duration_seconds,
            current_pace: self.current_pace,
            avg_pace: self.avg_pace,
            calories: self.calories,
            max_speed_kmph: self.max_speed_kmph,
            path: self.path.clone(),
        }
    }

    fn reset(&mut self) {
        self.start_time = None;
        self.distance_km = 0.0;
        self.duration_seconds = 0;
        self.current_pace = 0.0;
        self.avg_pace = 0.0;
        self.calories = 0;
        self.max_speed_kmph = 0.0;
        self.max_pace_per_km = 0.0;
        self.min_pace_per_km = 0.0;
        self.path.clear();
    }
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
fn sample(lon: f64, lat: f64, speed_kmph: Option<f64>, offset_seconds: i64) -> GeoSample {
    use geo_types::Point;

    GeoSample::new(
        Point::new(lon, lat),
        speed_kmph,
        DateTime::from_timestamp(1_700_000_000 + offset_seconds, 0).unwrap(),
    )
}

#[cfg(test)]
fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

#[test]
fn distance_accumulates_pairwise_in_arrival_order() {
    use run_tracker_lib::metrics::haversine_km;

    let mut session = TrackingSession::new();
    session.start(now());

    let samples = [
        sample(10.0, 56.0, None, 0),
        sample(10.001, 56.0, None, 1),
        sample(10.002, 56.001, None, 2),
        sample(10.002, 56.001, None, 3), // standing still
    ];

    let mut expected = 0.0;
    let mut previous_total = 0.0;
    for (index, point) in samples.iter().enumerate() {
        session.ingest(*point);
        if index > 0 {
            expected += haversine_km(samples[index - 1].position, point.position);
        }
        assert!(session.distance_km() >= previous_total);
        previous_total = session.distance_km();
    }

    assert!((session.distance_km() - expected).abs() < 1e-12);
    assert_eq!(session.path().len(), 4);
}

#[test]
fn averages_stay_at_zero_until_distance_and_duration_are_positive() {
    let mut session = TrackingSession::new();
    session.start(now());

    // Distance but no duration yet
    session.ingest(sample(10.0, 56.0, Some(10.0), 0));
    session.ingest(sample(10.001, 56.0, Some(10.0), 1));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.avg_pace, 0.0);
    assert_eq!(snapshot.calories, 0);

    // Duration but no distance
    let mut stationary = TrackingSession::new();
    stationary.start(now());
    stationary.tick();
    let snapshot = stationary.snapshot();
    assert_eq!(snapshot.avg_pace, 0.0);
    assert_eq!(snapshot.calories, 0);

    // Both positive
    session.tick();
    let snapshot = session.snapshot();
    assert!(snapshot.avg_pace > 0.0);
    assert_eq!(snapshot.calories, metrics::calculate_calories(snapshot.distance_km));
}

#[test]
fn reported_speed_is_preferred_over_derived() {
    let mut session = TrackingSession::new();
    session.start(now());

    session.ingest(sample(10.0, 56.0, None, 0));
    session.ingest(sample(10.001, 56.0, Some(12.0), 1));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.current_pace, 5.0);
    assert_eq!(snapshot.max_speed_kmph, 12.0);
}

#[test]
fn speed_falls_back_to_distance_over_time() {
    let mut session = TrackingSession::new();
    session.start(now());

    let first = sample(10.0, 56.0, None, 0);
    let second = sample(10.001, 56.0, None, 10);
    let delta_km = run_tracker_lib::metrics::haversine_km(first.position, second.position);

    session.ingest(first);
    session.ingest(second);

    let expected_kmph = delta_km / (10.0 / 3600.0);
    let snapshot = session.snapshot();
    assert!((snapshot.max_speed_kmph - expected_kmph).abs() < 1e-9);
    assert!((snapshot.current_pace - 60.0 / expected_kmph).abs() < 1e-9);
}

#[test]
fn pausing_suspends_distance_path_and_duration() {
    let mut session = TrackingSession::new();
    session.start(now());

    session.ingest(sample(10.0, 56.0, Some(10.0), 0));
    session.ingest(sample(10.001, 56.0, Some(10.0), 1));
    session.tick();

    let distance = session.distance_km();
    let duration = session.duration_seconds();

    session.pause();
    session.ingest(sample(10.005, 56.0, Some(10.0), 2));
    session.tick();

    assert_eq!(session.distance_km(), distance);
    assert_eq!(session.duration_seconds(), duration);
    assert_eq!(session.path().len(), 2);

    session.resume();
    session.ingest(sample(10.002, 56.0, Some(10.0), 3));
    session.tick();

    assert!(session.distance_km() > distance);
    assert_eq!(session.duration_seconds(), duration + 1);
    assert_eq!(session.path().len(), 3);
}

#[test]
fn stopping_an_untouched_session_produces_no_run() {
    let mut session = TrackingSession::new();

    // Stop from Idle is a no-op
    assert!(session.stop(now()).is_none());

    // Started but nothing accumulated
    session.start(now());
    assert!(session.stop(now()).is_none());
    assert_eq!(session.state(), TrackingState::Idle);
}

#[test]
fn stopping_after_activity_yields_a_completed_run_and_resets() {
    let mut session = TrackingSession::new();
    let started = now();
    session.start(started);

    session.ingest(sample(10.0, 56.0, Some(10.0), 0));
    session.ingest(sample(10.001, 56.0, Some(12.0), 1));
    session.ingest(sample(10.002, 56.0, Some(8.0), 2));
    for _ in 0..60 {
        session.tick();
    }

    let ended = started + chrono::Duration::seconds(60);
    let run = session.stop(ended).expect("run should be produced");

    assert_eq!(run.run_id, -1);
    assert!(run.completed);
    assert_eq!(run.start_time, started);
    assert_eq!(run.end_time, Some(ended));
    assert!(run.distance_km > 0.0);
    assert_eq!(run.duration_seconds, 60);
    assert!(run.avg_pace_per_km > 0.0);
    assert_eq!(run.calories_burned, (run.distance_km * 60.0) as i32);
    assert_eq!(run.max_speed_kmph, 12.0);
    // 8 km/h is the slowest observed pace, 12 km/h the fastest
    assert_eq!(run.max_pace_per_km, 60.0 / 8.0);
    assert_eq!(run.min_pace_per_km, 60.0 / 12.0);
    assert_eq!(run.path.len(), 3);

    // Everything is back at zero
    assert_eq!(session.state(), TrackingState::Idle);
    assert_eq!(session.distance_km(), 0.0);
    assert_eq!(session.duration_seconds(), 0);
    assert!(session.path().is_empty());
    assert_eq!(session.snapshot(), SessionSnapshot::default());
}

#[test]
fn duration_only_run_is_still_recorded() {
    let mut session = TrackingSession::new();
    session.start(now());
    session.tick();

    let run = session.stop(now() + chrono::Duration::seconds(1)).expect("treadmill run");
    assert_eq!(run.distance_km, 0.0);
    assert_eq!(run.duration_seconds, 1);
    assert_eq!(run.avg_pace_per_km, 0.0);
}
