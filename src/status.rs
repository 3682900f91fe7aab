use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::motion::MotionState;

/// Snapshot of tracker state rendered for the live feed. Published on every
/// sample, whether or not anything changed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub timestamp: DateTime<Utc>,
    pub height: f64,
    pub temperature: Option<f64>,
    pub motion: MotionState,
    pub floor: Option<usize>,
    pub samples_seen: u64,
    pub samples_forwarded: u64,
    pub sensor_resets: u64,
    pub uptime_seconds: u64,
}

impl TrackerStatus {
    pub fn render(&self) -> String {
        // A rendering failure here would be a bug in the struct itself; fall
        // back to an empty object rather than dropping the publish.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
