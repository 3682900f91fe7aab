use serde::{Deserialize, Serialize};

use crate::measurement::{Measurement, Window};

/// Motion state derived from the window each cycle, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Stationary,
    Moving,
}

/// Classifies car motion from the two most recent samples.
///
/// Pure over the window: no internal state, identical inputs give identical
/// answers.
#[derive(Clone, Copy, Debug)]
pub struct MotionClassifier {
    /// Units per second the car must exceed to count as moving.
    pub speed_threshold: f64,
}

impl MotionClassifier {
    pub fn new(speed_threshold: f64) -> Self {
        MotionClassifier { speed_threshold }
    }

    /// True iff the instantaneous speed between the two newest samples
    /// strictly exceeds the threshold. Fewer than two samples, or two samples
    /// with identical timestamps, count as not moving.
    pub fn is_moving(&self, window: &Window) -> bool {
        match (window.previous(), window.latest()) {
            (Some(prev), Some(latest)) => self.moving_between(prev, latest),
            _ => false,
        }
    }

    /// One-step edge detector: true iff the moving/stationary verdict over
    /// the window without its newest sample differs from the verdict over the
    /// last two samples. Needs at least three samples.
    ///
    /// A single noisy sample can flip this edge; smoothing is deliberately
    /// not applied here.
    pub fn just_changed(&self, window: &Window) -> bool {
        let n = window.len();
        if n < 3 {
            return false;
        }
        let tail: Vec<&Measurement> = window.iter().skip(n - 3).collect();
        let was_moving = self.moving_between(tail[0], tail[1]);
        let now_moving = self.moving_between(tail[1], tail[2]);
        was_moving != now_moving
    }

    pub fn state(&self, window: &Window) -> MotionState {
        if self.is_moving(window) {
            MotionState::Moving
        } else {
            MotionState::Stationary
        }
    }

    fn moving_between(&self, prev: &Measurement, latest: &Measurement) -> bool {
        let dt = latest
            .timestamp
            .signed_duration_since(prev.timestamp)
            .num_milliseconds() as f64
            / 1000.0;
        // Identical timestamps would give an undefined speed; treat as rest.
        if dt == 0.0 {
            return false;
        }
        let speed = (latest.height - prev.height) / dt;
        speed.abs() > self.speed_threshold
    }
}
