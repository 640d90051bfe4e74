use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use run_tracker_lib::run::Run;
use time::OffsetDateTime;

use crate::{DataManager, DataManagerError};

impl DataManager {
    /// Writes a stored run as GPX 1.1. The caller owns the writer, nothing
    /// is kept in the data directory.
    pub async fn export_gpx(&self, run_id: i64, writer: impl std::io::Write) -> Result<(), DataManagerError> {
        let run = self.get_run(run_id).await?
            .ok_or(DataManagerError::Export(format!("No run with id {}", run_id)))?;

        gpx::write(&run_to_gpx(&run), writer)
            .map_err(|_| DataManagerError::Export(format!("Failed to write GPX for run {}", run_id)))
    }
}

pub fn run_to_gpx(run: &Run) -> Gpx {
    let mut segment = TrackSegment::new();
    for sample in &run.path {
        let mut waypoint = Waypoint::new(sample.position);
        waypoint.time = OffsetDateTime::from_unix_timestamp(sample.timestamp.timestamp())
            .ok()
            .map(gpx::Time::from);
        // GPX speed is meters per second
        waypoint.speed = sample.speed_kmph.map(|kmph| kmph / 3.6);
        segment.points.push(waypoint);
    }

    let mut track = Track::new();
    track.name = Some(format!("Run {}", run.start_time.date_naive()));
    track.segments.push(segment);

    Gpx {
        version: GpxVersion::Gpx11,
        tracks: vec![track],
        ..Default::default()
    }
}

#[cfg(test)]
fn gpx_test_run() -> Run {
    use chrono::DateTime;
    use geo_types::Point;
    use run_tracker_lib::sample::GeoSample;

    let start_time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let path = (0..3)
        .map(|i| GeoSample::new(
            Point::new(10.0, 56.0 + i as f64 * 0.001),
            Some(10.8),
            start_time + chrono::Duration::seconds(i),
        ))
        .collect();

    let mut run = Run::new(start_time, None, 0.33, 120, 6.0, 19, 0.0, 0.0, 10.8, path);
    run.run_id = 7;
    run
}

#[test]
fn run_converts_to_a_single_track_with_all_points() {
    let gpx = run_to_gpx(&gpx_test_run());

    assert_eq!(gpx.version, GpxVersion::Gpx11);
    assert_eq!(gpx.tracks.len(), 1);
    assert_eq!(gpx.tracks[0].segments.len(), 1);

    let points = &gpx.tracks[0].segments[0].points;
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|point| point.time.is_some()));
    assert!((points[0].speed.unwrap() - 3.0).abs() < 1e-9);
    assert_eq!(points[2].point().y(), 56.002);
}

#[test]
fn gpx_document_serializes() {
    let mut buffer = Vec::new();
    gpx::write(&run_to_gpx(&gpx_test_run()), &mut buffer).unwrap();

    let document = String::from_utf8(buffer).unwrap();
    assert!(document.contains("<trkpt"));
    assert!(document.contains("lat=\"56\""));
}
