use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc::{error::TrySendError, Receiver, Sender};
use tokio::time::{interval, Duration};

use crate::measurement::Measurement;

/// Command sent back to the measurement source by the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorCommand {
    Reset,
}

/// A distance sensor backend. The physical drivers (I2C rangefinder, serial
/// rangefinder) implement this outside the core; the simulated sensor below
/// covers development and demos.
pub trait DistanceSensor: Send {
    fn read(&mut self) -> Result<Measurement>;
    fn reset(&mut self);
}

/// Deterministic elevator ride for running without hardware: dwell at the
/// ground, travel to the top, dwell, travel back down. A small sub-threshold
/// wobble keeps the readings looking like a live sensor.
pub struct SimulatedSensor {
    tick: u64,
    top_height: f64,
    dwell_ticks: u64,
    travel_ticks: u64,
}

impl SimulatedSensor {
    pub fn new(top_height: f64) -> Self {
        SimulatedSensor {
            tick: 0,
            top_height,
            dwell_ticks: 20,
            travel_ticks: 40,
        }
    }

    fn height_at(&self, tick: u64) -> f64 {
        let cycle = 2 * (self.dwell_ticks + self.travel_ticks);
        let phase = tick % cycle;
        let base = if phase < self.dwell_ticks {
            0.0
        } else if phase < self.dwell_ticks + self.travel_ticks {
            let progress = (phase - self.dwell_ticks) as f64 / self.travel_ticks as f64;
            progress * self.top_height
        } else if phase < 2 * self.dwell_ticks + self.travel_ticks {
            self.top_height
        } else {
            let progress = (phase - 2 * self.dwell_ticks - self.travel_ticks) as f64
                / self.travel_ticks as f64;
            (1.0 - progress) * self.top_height
        };
        // Sub-threshold wobble so dwelling never looks like a stuck sensor.
        base + (tick as f64 * 0.7).sin() * 0.3
    }
}

impl DistanceSensor for SimulatedSensor {
    fn read(&mut self) -> Result<Measurement> {
        let height = self.height_at(self.tick);
        self.tick += 1;
        Ok(Measurement::new(
            height.max(0.0),
            Some(21.0 + (self.tick as f64 * 0.05).sin()),
            Utc::now(),
        ))
    }

    fn reset(&mut self) {
        log::info!("simulated sensor reset");
        self.tick = 0;
    }
}

/// Sampling task: reads the sensor at a fixed period and pushes into the
/// tracker's channel, dropping samples when the consumer is behind. Reset
/// commands from the tracker are drained between reads.
pub async fn sensor_loop<S: DistanceSensor>(
    mut sensor: S,
    tx: Sender<Measurement>,
    mut ctl_rx: Receiver<SensorCommand>,
    period: Duration,
) {
    let mut ticker = interval(period);
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;

        while let Ok(cmd) = ctl_rx.try_recv() {
            match cmd {
                SensorCommand::Reset => sensor.reset(),
            }
        }

        let m = match sensor.read() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("sensor read failed: {e:#}");
                continue;
            }
        };

        match tx.try_send(m) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 100 == 0 {
                    log::debug!("sensor produced {} samples", sample_count);
                }
            }
            Err(TrySendError::Closed(_)) => {
                log::info!("measurement channel closed after {} samples", sample_count);
                break;
            }
            Err(TrySendError::Full(_)) => {
                // Tracker is behind, drop this sample.
            }
        }
    }
}
