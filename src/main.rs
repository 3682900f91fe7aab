use anyhow::Result;
use chrono::Duration as ChronoDuration;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

use liftwatch::config::TrackerConfig;
use liftwatch::feed;
use liftwatch::persistence::{self, HttpSink, LogSink};
use liftwatch::playback::{LogBackend, Player};
use liftwatch::sensors::{self, SimulatedSensor};
use liftwatch::tracker::{Collaborators, Tracker};

#[derive(Parser, Debug)]
#[command(name = "liftwatch")]
#[command(about = "Elevator position tracker with playback and telemetry", long_about = None)]
struct Args {
    /// Dashboard port
    #[arg(long, default_value = "10211")]
    port: u16,

    /// Metrics endpoint URL (omit to log instead of persisting)
    #[arg(long)]
    metrics_url: Option<String>,

    /// Sensor sample period in milliseconds
    #[arg(long, default_value = "500")]
    sample_period_ms: u64,

    /// Speed above which the car counts as moving (units/sec)
    #[arg(long, default_value = "5.0")]
    speed_threshold: f64,

    /// Tolerance band around each floor landmark (units)
    #[arg(long, default_value = "6.0")]
    floor_tolerance: f64,

    /// Resting height of the ground floor (units)
    #[arg(long, default_value = "0.0")]
    ground_height: f64,

    /// Resting height of the middle floor (units)
    #[arg(long, default_value = "290.0")]
    middle_height: f64,

    /// Resting height of the top floor (units)
    #[arg(long, default_value = "544.0")]
    top_height: f64,

    /// Maximum silence between persisted samples while parked (seconds)
    #[arg(long, default_value = "30")]
    idle_timeout_secs: i64,
}

impl Args {
    fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            speed_threshold: self.speed_threshold,
            floor_tolerance: self.floor_tolerance,
            ground_height: self.ground_height,
            middle_height: self.middle_height,
            top_height: self.top_height,
            idle_timeout: ChronoDuration::seconds(self.idle_timeout_secs),
            ..TrackerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.tracker_config();

    log::info!(
        "starting liftwatch: floors at {:.0}/{:.0}/{:.0} (±{:.0}), threshold {:.1}/s",
        config.ground_height,
        config.middle_height,
        config.top_height,
        config.floor_tolerance,
        config.speed_threshold,
    );

    let (measurement_tx, measurement_rx) = mpsc::channel(64);
    let (feed_tx, feed_rx) = mpsc::channel(64);
    let (sink_tx, sink_rx) = mpsc::channel(256);
    let (sensor_ctl_tx, sensor_ctl_rx) = mpsc::channel(8);

    let sensor = SimulatedSensor::new(config.top_height);
    tokio::spawn(sensors::sensor_loop(
        sensor,
        measurement_tx,
        sensor_ctl_rx,
        Duration::from_millis(args.sample_period_ms),
    ));

    match args.metrics_url.clone() {
        Some(url) => {
            log::info!("persisting measurements to {}", url);
            tokio::spawn(persistence::sink_loop(sink_rx, HttpSink::new(url)));
        }
        None => {
            log::info!("no metrics endpoint configured, logging writes instead");
            tokio::spawn(persistence::sink_loop(sink_rx, LogSink));
        }
    }

    let feed_state = feed::feed_state();
    tokio::spawn(feed::feed_loop(feed_rx, feed_state.clone()));
    let port = args.port;
    tokio::spawn(async move {
        if let Err(e) = feed::serve_dashboard(feed_state, port).await {
            log::error!("dashboard failed: {e:#}");
        }
    });

    let player = Arc::new(Player::new(Box::new(LogBackend)));

    let tracker = Tracker::new(&config);
    tracker
        .run(
            measurement_rx,
            Collaborators {
                player,
                feed_tx,
                sink_tx,
                sensor_ctl_tx,
            },
        )
        .await;

    Ok(())
}
