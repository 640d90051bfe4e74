use std::path::PathBuf;

use chrono::{DateTime, Utc};
use const_format::concatcp;
use run_tracker_lib::run::Run;
use sqlx::{
    Executor, Pool, Sqlite, SqlitePool, query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{DATABASE_PATH, DataManagerError};

use super::constants::*;

#[derive(Clone)]
pub struct RunDatabase {
    pool: Pool<Sqlite>,
}

impl RunDatabase {
    pub async fn connect() -> Result<Self, DataManagerError> {
        let root: PathBuf = project_root::get_project_root().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(root.join(DATABASE_PATH))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|_| DataManagerError::Database("Failed to connect to database".to_string()))?;

        let db = Self { pool };

        db.init().await;

        Ok(db)
    }

    /// In-memory database. A single pooled connection, every connection gets
    /// its own memory otherwise.
    pub async fn connect_in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|_| DataManagerError::Database("Failed to connect to database".to_string()))?;

        let db = Self { pool };

        db.init().await;

        Ok(db)
    }

    pub async fn init(&self) {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", RUNS_TABLE_NAME, "(",
                RUN_ID,           " INTEGER PRIMARY KEY AUTOINCREMENT,",
                START_TIME,       " TIMESTAMP NOT NULL,",
                END_TIME,         " TIMESTAMP,",
                DISTANCE_KM,      " REAL NOT NULL,",
                DURATION_SECONDS, " INTEGER NOT NULL,",
                AVG_PACE_PER_KM,  " REAL NOT NULL,",
                CALORIES_BURNED,  " INTEGER NOT NULL,",
                MAX_PACE_PER_KM,  " REAL NOT NULL,",
                MIN_PACE_PER_KM,  " REAL NOT NULL,",
                MAX_SPEED_KMPH,   " REAL NOT NULL,",
                PATH,             " BLOB NOT NULL,",
                COMPLETED,        " BOOLEAN NOT NULL
            )")).await.unwrap();
    }

    pub async fn insert_run(&self, run: &Run) -> Result<i64, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", RUNS_TABLE_NAME, "(",
            RUN_ID, ", ", START_TIME, ", ", END_TIME, ", ", DISTANCE_KM, ", ", DURATION_SECONDS, ", ",
            AVG_PACE_PER_KM, ", ", CALORIES_BURNED, ", ", MAX_PACE_PER_KM, ", ", MIN_PACE_PER_KM, ", ",
            MAX_SPEED_KMPH, ", ", PATH, ", ", COMPLETED, ")
            VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) RETURNING ", RUN_ID))
                .bind(run.start_time)
                .bind(run.end_time)
                .bind(run.distance_km)
                .bind(run.duration_seconds)
                .bind(run.avg_pace_per_km)
                .bind(run.calories_burned)
                .bind(run.max_pace_per_km)
                .bind(run.min_pace_per_km)
                .bind(run.max_speed_kmph)
                .bind(run.get_path_blob())
                .bind(run.completed)
                .fetch_one(&self.pool).await
                .map_err(|_| DataManagerError::Database("Failed to insert run".to_string()))
                .map(|row| row.0)
    }

    pub async fn get_run(&self, run_id: i64) -> Result<Option<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("SELECT * FROM ", RUNS_TABLE_NAME, " WHERE ", RUN_ID, " = ?1"))
            .bind(run_id)
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get run".to_string()))
    }

    pub async fn get_runs(&self) -> Result<Vec<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("SELECT * FROM ", RUNS_TABLE_NAME, " ORDER BY ", START_TIME, " DESC"))
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get runs".to_string()))
    }

    pub async fn get_latest_run(&self) -> Result<Option<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("SELECT * FROM ", RUNS_TABLE_NAME, " ORDER BY ", START_TIME, " DESC LIMIT 1"))
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get latest run".to_string()))
    }

    pub async fn get_runs_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("
            SELECT * FROM ", RUNS_TABLE_NAME, "
            WHERE ", START_TIME, " >= ?1 AND ", START_TIME, " < ?2
            ORDER BY ", START_TIME, " DESC"))
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get runs in range".to_string()))
    }

    pub async fn delete_run(&self, run_id: i64) -> Result<(), DataManagerError> {
        query(concatcp!("DELETE FROM ", RUNS_TABLE_NAME, " WHERE ", RUN_ID, " = ?1"))
            .bind(run_id)
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to delete run".to_string()))
            .map(|_| ())
    }

    pub async fn delete_all_runs(&self) -> Result<(), DataManagerError> {
        query(concatcp!("DELETE FROM ", RUNS_TABLE_NAME))
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to delete runs".to_string()))
            .map(|_| ())
    }

    pub async fn run_count(&self) -> Result<i64, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("SELECT COUNT(*) FROM ", RUNS_TABLE_NAME))
            .fetch_one(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to count runs".to_string()))
            .map(|row| row.0)
    }

    pub async fn total_distance(&self) -> Result<f64, DataManagerError> {
        query_as::<_, (Option<f64>,)>(concatcp!("
            SELECT SUM(", DISTANCE_KM, ") FROM ", RUNS_TABLE_NAME, " WHERE ", COMPLETED, " = 1"))
            .fetch_one(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to sum distances".to_string()))
            .map(|row| row.0.unwrap_or(0.0))
    }

    pub async fn total_distance_since(&self, since: DateTime<Utc>) -> Result<f64, DataManagerError> {
        query_as::<_, (Option<f64>,)>(concatcp!("
            SELECT SUM(", DISTANCE_KM, ") FROM ", RUNS_TABLE_NAME, "
            WHERE ", COMPLETED, " = 1 AND ", START_TIME, " >= ?1"))
            .bind(since)
            .fetch_one(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to sum distances".to_string()))
            .map(|row| row.0.unwrap_or(0.0))
    }

    pub async fn longest_run(&self) -> Result<Option<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("SELECT * FROM ", RUNS_TABLE_NAME, " ORDER BY ", DISTANCE_KM, " DESC LIMIT 1"))
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get longest run".to_string()))
    }

    /// The run with the fastest average pace among runs of at least the given
    /// distance. Runs without a defined average pace are skipped.
    pub async fn fastest_avg_pace(&self, min_distance_km: f64) -> Result<Option<Run>, DataManagerError> {
        query_as::<_, Run>(concatcp!("
            SELECT * FROM ", RUNS_TABLE_NAME, "
            WHERE ", DISTANCE_KM, " >= ?1 AND ", AVG_PACE_PER_KM, " > 0
            ORDER BY ", AVG_PACE_PER_KM, " ASC LIMIT 1"))
            .bind(min_distance_km)
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get fastest run".to_string()))
    }
}
