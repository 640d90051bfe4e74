use std::path::PathBuf;

use chrono::{DateTime, Utc};
use run_tracker_lib::run::Run;

use crate::{DATA_DIR, DataManagerError, database::db::RunDatabase};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: RunDatabase,
}

/// The public interface for all run tracker data management.
impl DataManager {
    pub async fn start() -> Result<Self, DataManagerError> {
        // Create data dir if it doesn't exist
        let root: PathBuf = project_root::get_project_root().unwrap();
        let data_dir = root.join(DATA_DIR);
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)
                .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", data_dir)))?;
        }

        let database = RunDatabase::connect().await?;

        Ok(DataManager { database })
    }

    pub async fn start_in_memory() -> Result<Self, DataManagerError> {
        let database = RunDatabase::connect_in_memory().await?;

        Ok(DataManager { database })
    }

    /// Persists a finished run and returns it with its assigned id.
    pub async fn save_run(&self, run: Run) -> Result<Run, DataManagerError> {
        let run_id = self.database.insert_run(&run).await?;
        tracing::info!("Saved run {} ({:.2} km, {} s)", run_id, run.distance_km, run.duration_seconds);
        Ok(Run { run_id, ..run })
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<Run>, DataManagerError> {
        self.database.get_run(run_id).await
    }

    pub async fn get_runs(&self) -> Result<Vec<Run>, DataManagerError> {
        self.database.get_runs().await
    }

    pub async fn latest_run(&self) -> Result<Option<Run>, DataManagerError> {
        self.database.get_latest_run().await
    }

    pub async fn runs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Run>, DataManagerError> {
        self.database.get_runs_between(start, end).await
    }

    pub async fn delete_run(&self, run_id: i64) -> Result<(), DataManagerError> {
        self.database.delete_run(run_id).await
    }

    pub async fn delete_all_runs(&self) -> Result<(), DataManagerError> {
        self.database.delete_all_runs().await
    }

    pub async fn run_count(&self) -> Result<i64, DataManagerError> {
        self.database.run_count().await
    }

    pub async fn total_distance_km(&self) -> Result<f64, DataManagerError> {
        self.database.total_distance().await
    }

    pub async fn distance_since(&self, since: DateTime<Utc>) -> Result<f64, DataManagerError> {
        self.database.total_distance_since(since).await
    }

    pub async fn longest_run(&self) -> Result<Option<Run>, DataManagerError> {
        self.database.longest_run().await
    }

    pub async fn fastest_avg_pace(&self, min_distance_km: f64) -> Result<Option<Run>, DataManagerError> {
        self.database.fastest_avg_pace(min_distance_km).await
    }
}

#[cfg(test)]
fn test_run(start_offset_seconds: i64, distance_km: f64, duration_seconds: i64) -> Run {
    use geo_types::Point;
    use run_tracker_lib::sample::GeoSample;

    let start_time = DateTime::from_timestamp(1_700_000_000 + start_offset_seconds, 0).unwrap();
    let path = vec![
        GeoSample::new(Point::new(10.0, 56.0), Some(10.0), start_time),
        GeoSample::new(Point::new(10.0, 56.01), Some(10.0), start_time + chrono::Duration::seconds(duration_seconds)),
    ];

    Run::new(
        start_time,
        Some(start_time + chrono::Duration::seconds(duration_seconds)),
        distance_km,
        duration_seconds,
        duration_seconds as f64 / distance_km / 60.0,
        (distance_km * 60.0) as i32,
        7.2,
        4.8,
        12.5,
        path,
    )
}

#[tokio::test]
async fn save_and_read_back_a_run() {
    let data_manager = DataManager::start_in_memory().await.unwrap();

    let saved = data_manager.save_run(test_run(0, 5.0, 1800)).await.unwrap();
    assert!(saved.run_id > 0);

    let fetched = data_manager.get_run(saved.run_id).await.unwrap().unwrap();
    assert_eq!(fetched, saved);
    assert_eq!(fetched.path.len(), 2);

    assert!(data_manager.get_run(saved.run_id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn history_is_ordered_newest_first() {
    let data_manager = DataManager::start_in_memory().await.unwrap();

    let first = data_manager.save_run(test_run(0, 3.0, 1000)).await.unwrap();
    let second = data_manager.save_run(test_run(86_400, 5.0, 1800)).await.unwrap();

    let runs = data_manager.get_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, second.run_id);
    assert_eq!(runs[1].run_id, first.run_id);

    let latest = data_manager.latest_run().await.unwrap().unwrap();
    assert_eq!(latest.run_id, second.run_id);

    let in_range = data_manager
        .runs_between(first.start_time, second.start_time)
        .await
        .unwrap();
    assert_eq!(in_range.len(), 1);
    assert_eq!(in_range[0].run_id, first.run_id);
}

#[tokio::test]
async fn aggregates_over_completed_runs() {
    let data_manager = DataManager::start_in_memory().await.unwrap();

    assert_eq!(data_manager.run_count().await.unwrap(), 0);
    assert_eq!(data_manager.total_distance_km().await.unwrap(), 0.0);
    assert!(data_manager.latest_run().await.unwrap().is_none());
    assert!(data_manager.longest_run().await.unwrap().is_none());

    data_manager.save_run(test_run(0, 3.0, 1000)).await.unwrap();
    let long = data_manager.save_run(test_run(86_400, 10.0, 3200)).await.unwrap();

    assert_eq!(data_manager.run_count().await.unwrap(), 2);
    assert!((data_manager.total_distance_km().await.unwrap() - 13.0).abs() < 1e-9);
    assert!((data_manager.distance_since(long.start_time).await.unwrap() - 10.0).abs() < 1e-9);

    assert_eq!(data_manager.longest_run().await.unwrap().unwrap().run_id, long.run_id);

    // 10 km in 3200 s beats 3 km in 1000 s on pace, and only the long run
    // clears the 5 km bar.
    let fastest = data_manager.fastest_avg_pace(5.0).await.unwrap().unwrap();
    assert_eq!(fastest.run_id, long.run_id);
    assert!(data_manager.fastest_avg_pace(15.0).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_runs() {
    let data_manager = DataManager::start_in_memory().await.unwrap();

    let run = data_manager.save_run(test_run(0, 3.0, 1000)).await.unwrap();
    data_manager.save_run(test_run(86_400, 5.0, 1800)).await.unwrap();

    data_manager.delete_run(run.run_id).await.unwrap();
    assert!(data_manager.get_run(run.run_id).await.unwrap().is_none());
    assert_eq!(data_manager.run_count().await.unwrap(), 1);

    data_manager.delete_all_runs().await.unwrap();
    assert_eq!(data_manager.run_count().await.unwrap(), 0);
}
