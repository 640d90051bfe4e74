use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use geo_types::Point;
use run_tracker_lib::{metrics::EARTH_RADIUS_KM, sample::GeoSample};
use tokio::{sync::broadcast, task::JoinHandle};

/// External provider of GPS fixes. Implementations own permission handling,
/// sampling cadence and platform plumbing, the service only consumes the
/// resulting stream.
#[async_trait]
pub trait LocationSource: Send {
    /// Begin producing samples and hand back the stream to consume.
    async fn start(&mut self) -> anyhow::Result<broadcast::Receiver<GeoSample>>;

    async fn stop(&mut self) -> anyhow::Result<()>;
}

/// Walks due north from an origin at a constant speed, emitting one sample
/// per `cadence`. Each sample represents one second of motion regardless of
/// cadence, so replays can run faster than real time.
pub struct SimulatedLocationSource {
    origin: Point,
    speed_kmph: f64,
    cadence: Duration,
    emitter: Option<JoinHandle<()>>,
}

impl SimulatedLocationSource {
    pub fn new(origin: Point, speed_kmph: f64, cadence: Duration) -> Self {
        Self {
            origin,
            speed_kmph,
            cadence,
            emitter: None,
        }
    }
}

#[async_trait]
impl LocationSource for SimulatedLocationSource {
    async fn start(&mut self) -> anyhow::Result<broadcast::Receiver<GeoSample>> {
        if self.emitter.is_some() {
            anyhow::bail!("Simulated source is already running");
        }

        let (sender, receiver) = broadcast::channel(64);

        let origin = self.origin;
        let speed_kmph = self.speed_kmph;
        let cadence = self.cadence;

        self.emitter = Some(tokio::spawn(async move {
            let km_per_degree = EARTH_RADIUS_KM.to_radians();
            let km_per_step = speed_kmph / 3600.0;

            let start_time = Utc::now();
            let mut interval = tokio::time::interval(cadence);

            for step in 0.. {
                interval.tick().await;

                let position = Point::new(origin.x(), origin.y() + step as f64 * km_per_step / km_per_degree);
                let timestamp = start_time + chrono::Duration::seconds(step);
                if sender.send(GeoSample::new(position, Some(speed_kmph), timestamp)).is_err() {
                    // Listener went away
                    break;
                }
            }
        }));

        Ok(receiver)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }

        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_source_walks_north_at_constant_speed() {
    let mut source = SimulatedLocationSource::new(
        Point::new(10.0, 56.0),
        12.0,
        Duration::from_millis(10),
    );

    let mut samples = source.start().await.unwrap();

    let first = samples.recv().await.unwrap();
    let second = samples.recv().await.unwrap();
    let third = samples.recv().await.unwrap();

    assert_eq!(first.position, Point::new(10.0, 56.0));
    assert_eq!(first.speed_kmph, Some(12.0));
    assert_eq!((second.timestamp - first.timestamp).num_seconds(), 1);

    // One virtual second at 12 km/h is 1/300 km
    let step_km = run_tracker_lib::metrics::haversine_km(second.position, third.position);
    assert!((step_km - 12.0 / 3600.0).abs() < 1e-6);

    source.stop().await.unwrap();
}
