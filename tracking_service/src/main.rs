use std::time::Duration;

use geo_types::Point;
use run_tracker_data_management::DataManager;
use run_tracker_lib::{
    format::{format_duration, format_pace},
    metrics::generate_splits,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracking_service::{location::SimulatedLocationSource, service::TrackingService};

/// Replays a simulated run through the full pipeline: location stream,
/// session actor, persistence, history queries and GPX export.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_manager = DataManager::start().await
        .map_err(|err| anyhow::anyhow!("Failed to start data manager: {err:?}"))?;

    // 12 km/h up the Danish east coast, one virtual second per 50 ms
    let source = SimulatedLocationSource::new(
        Point::new(10.203921, 56.162939),
        12.0,
        Duration::from_millis(50),
    );
    let service = TrackingService::spawn(source, data_manager.clone());

    let mut live = service.snapshot();
    tokio::spawn(async move {
        while live.changed().await.is_ok() {
            let snapshot = live.borrow().clone();
            if snapshot.path.len() % 20 == 0 && !snapshot.path.is_empty() {
                tracing::info!(
                    "{:?}: {:.3} km in {}, pace {}",
                    snapshot.state,
                    snapshot.distance_km,
                    format_duration(snapshot.duration_seconds),
                    format_pace(snapshot.current_pace),
                );
            }
        }
    });

    service.start().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    service.pause().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    service.resume().await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    service.stop().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let run = data_manager.latest_run().await
        .map_err(|err| anyhow::anyhow!("Failed to fetch latest run: {err:?}"))?
        .ok_or_else(|| anyhow::anyhow!("No run was recorded"))?;

    tracing::info!("Recorded run:\n{}", serde_json::to_string_pretty(&run)?);

    for split in generate_splits(run.distance_km, run.duration_seconds, 1.0) {
        tracing::info!(
            "Split {}: {:.1} km in {} ({})",
            split.number,
            split.distance_km,
            format_duration(split.duration_seconds),
            format_pace(split.pace_min_per_km),
        );
    }

    let total_km = data_manager.total_distance_km().await
        .map_err(|err| anyhow::anyhow!("Failed to sum distances: {err:?}"))?;
    let count = data_manager.run_count().await
        .map_err(|err| anyhow::anyhow!("Failed to count runs: {err:?}"))?;
    tracing::info!("History: {} runs, {:.2} km total", count, total_km);

    let gpx_dir = project_root::get_project_root()?.join("data/gpx");
    std::fs::create_dir_all(&gpx_dir)?;
    let gpx_path = gpx_dir.join(format!("run_{}.gpx", run.run_id));
    data_manager.export_gpx(run.run_id, std::fs::File::create(&gpx_path)?).await
        .map_err(|err| anyhow::anyhow!("Failed to export GPX: {err:?}"))?;
    tracing::info!("Exported {:?}", gpx_path);

    Ok(())
}
