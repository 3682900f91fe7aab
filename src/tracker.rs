use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::TrackerConfig;
use crate::floors::FloorMap;
use crate::gate::PersistenceGate;
use crate::measurement::{Measurement, Window};
use crate::motion::{MotionClassifier, MotionState};
use crate::playback::Player;
use crate::sensors::SensorCommand;
use crate::staleness::StalenessWatchdog;
use crate::status::TrackerStatus;

/// One-way command to an external collaborator, emitted by the tracker and
/// dispatched by the run loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Start,
    Stop,
    SetVolume(f64),
    Announce(usize),
    ResetSensor,
}

/// Everything one sample's processing cycle decided. The status snapshot is
/// always published; forwarding and intents are conditional.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub status: TrackerStatus,
    pub forward: bool,
    pub intents: Vec<Intent>,
}

/// Channel and handle fabric connecting the tracker to its collaborators.
/// Everything except the player is fire-and-forget; the player serializes
/// its own state behind a mutex and is called inline.
pub struct Collaborators {
    pub player: Arc<Player>,
    pub feed_tx: mpsc::Sender<String>,
    pub sink_tx: mpsc::Sender<Measurement>,
    pub sensor_ctl_tx: mpsc::Sender<SensorCommand>,
}

/// The single consumer of the measurement stream. Runs classifier, floor
/// locator, staleness watchdog, and persistence gate per sample, in that
/// order, and emits the resulting side-effect intents.
pub struct Tracker {
    window: Window,
    classifier: MotionClassifier,
    floors: FloorMap,
    watchdog: StalenessWatchdog,
    gate: PersistenceGate,
    top_height: f64,

    state: MotionState,
    last_transition: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    samples_seen: u64,
    samples_forwarded: u64,
    sensor_resets: u64,
}

impl Tracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Tracker {
            window: Window::new(config.window_capacity),
            classifier: MotionClassifier::new(config.speed_threshold),
            floors: config.floor_map(),
            watchdog: StalenessWatchdog::new(config.staleness_window),
            gate: PersistenceGate::new(config.idle_timeout),
            top_height: config.top_height,
            state: MotionState::Stationary,
            last_transition: None,
            started_at: None,
            samples_seen: 0,
            samples_forwarded: 0,
            sensor_resets: 0,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.last_transition
    }

    /// Run one processing cycle over a fresh sample. Pure over the tracker's
    /// own state: all I/O is left to the caller via the returned outcome.
    pub fn observe(&mut self, m: Measurement) -> CycleOutcome {
        let started_at = *self.started_at.get_or_insert(m.timestamp);
        self.samples_seen += 1;

        let height = m.height;
        let temperature = m.temperature;
        let timestamp = m.timestamp;
        self.window.push(m);

        let moving = self.classifier.is_moving(&self.window);
        let changed = self.classifier.just_changed(&self.window);
        let floor = self.floors.locate(&self.window);

        let forward = self.gate.should_forward(moving, timestamp);
        if forward {
            self.samples_forwarded += 1;
        }

        let mut intents = Vec::new();

        // Ambient music fades out as the car climbs.
        if moving {
            let volume = (3.0 - 3.0 * height / self.top_height).clamp(0.0, 3.0);
            intents.push(Intent::SetVolume(volume));
        }

        if changed {
            self.last_transition = Some(timestamp);
            if moving {
                self.state = MotionState::Moving;
                intents.push(Intent::Start);
            } else {
                self.state = MotionState::Stationary;
                match floor {
                    Some(id) => {
                        intents.push(Intent::Stop);
                        intents.push(Intent::Announce(id));
                    }
                    // Stopped between floors: keep the music running until a
                    // floor is actually reached.
                    None => {}
                }
            }
        }

        if self.watchdog.is_stale(&self.window) {
            self.sensor_resets += 1;
            intents.push(Intent::ResetSensor);
        }

        let status = TrackerStatus {
            timestamp,
            height,
            temperature,
            motion: if moving {
                MotionState::Moving
            } else {
                MotionState::Stationary
            },
            floor,
            samples_seen: self.samples_seen,
            samples_forwarded: self.samples_forwarded,
            sensor_resets: self.sensor_resets,
            uptime_seconds: timestamp
                .signed_duration_since(started_at)
                .num_seconds()
                .max(0) as u64,
        };

        CycleOutcome {
            status,
            forward,
            intents,
        }
    }

    /// Consume the measurement stream until the source closes. Side-effect
    /// delivery failures are logged and dropped; the loop itself never stops
    /// because of them.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Measurement>, c: Collaborators) {
        while let Some(m) = rx.recv().await {
            let outcome = self.observe(m.clone());

            if c.feed_tx.try_send(outcome.status.render()).is_err() {
                log::debug!("live feed behind, dropping status update");
            }

            if outcome.forward && c.sink_tx.try_send(m).is_err() {
                log::warn!("metrics channel full, dropping forwarded sample");
            }

            for intent in outcome.intents {
                match intent {
                    Intent::Start => c.player.start(),
                    Intent::Stop => c.player.stop(),
                    Intent::SetVolume(v) => c.player.set_volume(v),
                    Intent::Announce(floor) => c.player.announce(floor),
                    Intent::ResetSensor => {
                        log::warn!("sensor readings stuck, requesting reset");
                        if c.sensor_ctl_tx.try_send(SensorCommand::Reset).is_err() {
                            log::warn!("sensor control channel full, reset dropped");
                        }
                    }
                }
            }
        }
        log::info!("measurement stream closed, tracker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(secs: i64, height: f64) -> Measurement {
        Measurement::new(height, None, Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn tracker() -> Tracker {
        Tracker::new(&TrackerConfig::default())
    }

    #[test]
    fn test_start_intent_on_motion_edge() {
        let mut t = tracker();
        t.observe(sample(0, 0.0));
        t.observe(sample(1, 0.0));
        let outcome = t.observe(sample(2, 10.0));

        assert_eq!(t.state(), MotionState::Moving);
        assert_eq!(t.last_transition(), Some(Utc.timestamp_opt(2, 0).unwrap()));
        // Volume intent precedes the transition intent.
        assert!(matches!(outcome.intents[0], Intent::SetVolume(_)));
        assert_eq!(outcome.intents[1], Intent::Start);
    }

    #[test]
    fn test_stop_and_announce_at_ground_floor() {
        let mut t = tracker();
        t.observe(sample(0, 10.0));
        t.observe(sample(1, 0.0));
        let outcome = t.observe(sample(2, 0.0));

        assert_eq!(t.state(), MotionState::Stationary);
        assert_eq!(outcome.intents, vec![Intent::Stop, Intent::Announce(0)]);
    }

    #[test]
    fn test_no_stop_between_floors() {
        let mut t = tracker();
        t.observe(sample(0, 160.0));
        t.observe(sample(1, 150.0));
        let outcome = t.observe(sample(2, 150.0));

        // Edge into Idle away from any landmark: playback keeps running.
        assert!(outcome.intents.is_empty());
        assert_eq!(t.state(), MotionState::Stationary);
    }

    #[test]
    fn test_stale_sensor_at_top_floor() {
        let mut t = tracker();
        let mut last = None;
        for i in 0..5 {
            last = Some(t.observe(sample(i, 544.0)));
        }
        let outcome = last.unwrap();

        // Staleness and the floor match coexist.
        assert!(outcome.intents.contains(&Intent::ResetSensor));
        assert_eq!(outcome.status.floor, Some(2));
        assert_eq!(outcome.status.sensor_resets, 1);
    }

    #[test]
    fn test_volume_scales_with_height() {
        let mut t = tracker();
        t.observe(sample(0, 0.0));
        t.observe(sample(1, 262.0));
        let outcome = t.observe(sample(2, 272.0));

        let volume = match outcome.intents[0] {
            Intent::SetVolume(v) => v,
            ref other => panic!("expected SetVolume, got {:?}", other),
        };
        // 3 - 3 * 272 / 544 = 1.5
        approx::assert_relative_eq!(volume, 1.5);
    }

    #[test]
    fn test_volume_clamped_above_top() {
        let mut t = tracker();
        t.observe(sample(0, 540.0));
        let outcome = t.observe(sample(1, 600.0));

        assert_eq!(outcome.intents[0], Intent::SetVolume(0.0));
    }

    #[test]
    fn test_status_published_every_sample() {
        let mut t = tracker();
        let first = t.observe(sample(0, 0.0));
        let second = t.observe(sample(10, 0.0));

        assert_eq!(first.status.samples_seen, 1);
        assert_eq!(second.status.samples_seen, 2);
        assert_eq!(second.status.uptime_seconds, 10);
    }

    #[test]
    fn test_forwarding_follows_gate() {
        let mut t = tracker();
        // First sample always forwards.
        assert!(t.observe(sample(0, 0.0)).forward);
        // Parked within the idle timeout: suppressed.
        assert!(!t.observe(sample(10, 0.0)).forward);
        // Moving: forwarded again.
        assert!(t.observe(sample(11, 100.0)).forward);
    }

    #[test]
    fn test_idle_heartbeat_forward() {
        let mut t = tracker();
        assert!(t.observe(sample(0, 0.0)).forward);
        assert!(!t.observe(sample(20, 0.1)).forward);
        assert!(t.observe(sample(40, 0.0)).forward);
    }
}
