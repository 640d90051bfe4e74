use std::time::Duration;

use chrono::Utc;
use run_tracker_data_management::DataManager;
use run_tracker_lib::sample::GeoSample;
use tokio::{
    sync::{broadcast, mpsc, watch},
    time::MissedTickBehavior,
};

use crate::{
    location::LocationSource,
    session::{SessionSnapshot, TrackingSession, TrackingState},
};

#[derive(Debug)]
enum Command {
    Start,
    Pause,
    Resume,
    Stop,
}

/// Handle to the tracking actor.
///
/// One spawned task owns the session and applies commands, location samples
/// and duration ticks one at a time, so accumulator updates never race.
#[derive(Clone)]
pub struct TrackingService {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl TrackingService {
    /// Spawns the actor. The service keeps running across sessions until
    /// every handle is dropped.
    pub fn spawn(source: impl LocationSource + 'static, data_manager: DataManager) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        tokio::spawn(run_actor(source, data_manager, command_rx, snapshot_tx));

        Self {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> anyhow::Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> anyhow::Result<()> {
        self.send(Command::Resume).await
    }

    /// Ends the session. Any finished run is handed to the store
    /// fire-and-forget, the caller never waits on the write.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(Command::Stop).await
    }

    /// Live session state. Await `changed()` on the receiver to follow
    /// updates as samples and ticks arrive.
    pub fn snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("Tracking actor has shut down"))
    }
}

async fn run_actor(
    mut source: impl LocationSource,
    data_manager: DataManager,
    mut commands: mpsc::Receiver<Command>,
    snapshot: watch::Sender<SessionSnapshot>,
) {
    let mut session = TrackingSession::new();
    let mut samples: Option<broadcast::Receiver<GeoSample>> = None;

    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // Every handle dropped, shut the actor down
                    break;
                };

                match command {
                    Command::Start => {
                        if session.state() == TrackingState::Idle {
                            match source.start().await {
                                Ok(receiver) => {
                                    samples = Some(receiver);
                                    session.start(Utc::now());
                                    tick.reset();
                                    tracing::info!("Tracking started");
                                }
                                Err(err) => tracing::error!("Failed to start location source: {err:?}"),
                            }
                        }
                    }
                    Command::Pause => {
                        session.pause();
                        tracing::info!("Tracking paused");
                    }
                    Command::Resume => {
                        session.resume();
                        tracing::info!("Tracking resumed");
                    }
                    Command::Stop => {
                        if session.state() != TrackingState::Idle {
                            if let Err(err) = source.stop().await {
                                tracing::warn!("Failed to stop location source: {err:?}");
                            }
                            samples = None;

                            if let Some(run) = session.stop(Utc::now()) {
                                tracing::info!("Session finished: {:.2} km in {} s", run.distance_km, run.duration_seconds);
                                let data_manager = data_manager.clone();
                                tokio::spawn(async move {
                                    if let Err(err) = data_manager.save_run(run).await {
                                        tracing::error!("Failed to save run: {err:?}");
                                    }
                                });
                            } else {
                                tracing::info!("Session discarded, nothing was recorded");
                            }
                        }
                    }
                }

                let _ = snapshot.send(session.snapshot());
            }

            sample = next_sample(&mut samples) => {
                match sample {
                    Some(sample) => {
                        session.ingest(sample);
                        let _ = snapshot.send(session.snapshot());
                    }
                    None => {
                        tracing::warn!("Location stream closed");
                        samples = None;
                    }
                }
            }

            _ = tick.tick(), if session.state() == TrackingState::Active => {
                session.tick();
                let _ = snapshot.send(session.snapshot());
            }
        }
    }
}

/// Next sample from the stream, pending forever while no stream is
/// attached. Lagged readers just skip ahead.
async fn next_sample(samples: &mut Option<broadcast::Receiver<GeoSample>>) -> Option<GeoSample> {
    match samples {
        Some(receiver) => loop {
            match receiver.recv().await {
                Ok(sample) => return Some(sample),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {skipped} location samples");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use geo_types::Point;
    use run_tracker_lib::metrics::haversine_km;

    use super::*;
    use async_trait::async_trait;

    struct ScriptedSource {
        sender: broadcast::Sender<GeoSample>,
        stopped: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    impl ScriptedSource {
        fn new() -> (Self, broadcast::Sender<GeoSample>, std::sync::Arc<std::sync::atomic::AtomicBool>) {
            let (sender, _) = broadcast::channel(64);
            let stopped = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            (
                Self {
                    sender: sender.clone(),
                    stopped: stopped.clone(),
                },
                sender,
                stopped,
            )
        }
    }

    #[async_trait]
    impl LocationSource for ScriptedSource {
        async fn start(&mut self) -> anyhow::Result<broadcast::Receiver<GeoSample>> {
            Ok(self.sender.subscribe())
        }

        async fn stop(&mut self) -> anyhow::Result<()> {
            self.stopped.store(true, std::sync::atomic::Ordering::Relaxed);
            Ok(())
        }
    }

    fn fix(lon: f64, lat: f64, offset_seconds: i64) -> GeoSample {
        GeoSample::new(
            Point::new(lon, lat),
            Some(10.0),
            chrono::DateTime::from_timestamp(1_700_000_000 + offset_seconds, 0).unwrap(),
        )
    }

    async fn settle() {
        // Let the actor and any spawned writes drain
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn full_session_is_tracked_and_persisted() {
        // Connect under real time, then pause — see the note in
        // `stopping_an_empty_session_stores_nothing` for why.
        let data_manager = DataManager::start_in_memory().await.unwrap();
        tokio::time::pause();
        let (source, sender, stopped) = ScriptedSource::new();
        let service = TrackingService::spawn(source, data_manager.clone());
        let live = service.snapshot();

        service.start().await.unwrap();
        settle().await;

        sender.send(fix(10.0, 56.0, 0)).unwrap();
        sender.send(fix(10.001, 56.0, 1)).unwrap();
        settle().await;

        let expected = haversine_km(Point::new(10.0, 56.0), Point::new(10.001, 56.0));
        {
            let snapshot = live.borrow();
            assert_eq!(snapshot.state, TrackingState::Active);
            assert!((snapshot.distance_km - expected).abs() < 1e-12);
            assert_eq!(snapshot.path.len(), 2);
            assert_eq!(snapshot.current_pace, 6.0);
        }

        // Two seconds of paused-clock time, two duration ticks
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(live.borrow().duration_seconds >= 1);

        // Resume real time for the persistence section: the fire-and-forget
        // save runs on sqlx's background SQLite thread, and under a paused
        // clock the read below auto-advances past the pool acquire timeout
        // before that thread releases the single connection.
        tokio::time::resume();
        service.stop().await.unwrap();
        settle().await;
        assert!(stopped.load(std::sync::atomic::Ordering::Relaxed));
        assert_eq!(live.borrow().state, TrackingState::Idle);
        assert_eq!(live.borrow().distance_km, 0.0);

        let runs = data_manager.get_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!((runs[0].distance_km - expected).abs() < 1e-12);
        assert!(runs[0].completed);
    }

    #[tokio::test]
    async fn paused_session_ignores_samples() {
        // Connect under real time, then pause — see the note in
        // `stopping_an_empty_session_stores_nothing` for why.
        let data_manager = DataManager::start_in_memory().await.unwrap();
        tokio::time::pause();
        let (source, sender, _stopped) = ScriptedSource::new();
        let service = TrackingService::spawn(source, data_manager.clone());
        let live = service.snapshot();

        service.start().await.unwrap();
        settle().await;
        sender.send(fix(10.0, 56.0, 0)).unwrap();
        sender.send(fix(10.001, 56.0, 1)).unwrap();
        settle().await;

        let distance = live.borrow().distance_km;

        service.pause().await.unwrap();
        settle().await;
        sender.send(fix(10.01, 56.0, 2)).unwrap();
        settle().await;

        assert_eq!(live.borrow().state, TrackingState::Paused);
        assert_eq!(live.borrow().distance_km, distance);
        assert_eq!(live.borrow().path.len(), 2);

        service.resume().await.unwrap();
        settle().await;
        sender.send(fix(10.002, 56.0, 3)).unwrap();
        settle().await;

        assert!(live.borrow().distance_km > distance);
        assert_eq!(live.borrow().path.len(), 3);
    }

    #[tokio::test]
    async fn stopping_an_empty_session_stores_nothing() {
        // Establish the in-memory DB under real time: under a paused clock the
        // runtime auto-advances past sqlx's pool acquire timeout before the
        // background SQLite connect completes (PoolTimedOut). Pause afterwards
        // so the tracking logic still runs on a controlled clock.
        let data_manager = DataManager::start_in_memory().await.unwrap();
        tokio::time::pause();
        let (source, _sender, _stopped) = ScriptedSource::new();
        let service = TrackingService::spawn(source, data_manager.clone());

        service.start().await.unwrap();
        service.stop().await.unwrap();
        settle().await;

        assert_eq!(data_manager.run_count().await.unwrap(), 0);
    }
}
