use chrono::Duration;

use crate::floors::FloorMap;

/// Tunables for the decision core. The shaft geometry and thresholds vary
/// per installation; everything here can be overridden from the command line.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Samples kept in the sliding window.
    pub window_capacity: usize,
    /// Units per second above which the car counts as moving.
    pub speed_threshold: f64,
    /// Band around each landmark that still counts as that floor.
    pub floor_tolerance: f64,
    /// Resting heights of the three stops.
    pub ground_height: f64,
    pub middle_height: f64,
    pub top_height: f64,
    /// Maximum silence between persisted samples while the car is parked.
    pub idle_timeout: Duration,
    /// Samples of identical readings before the sensor counts as stuck.
    pub staleness_window: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            window_capacity: 10,
            speed_threshold: 5.0,
            floor_tolerance: 6.0,
            ground_height: 0.0,
            middle_height: 290.0,
            top_height: 544.0,
            idle_timeout: Duration::seconds(30),
            staleness_window: 5,
        }
    }
}

impl TrackerConfig {
    pub fn floor_map(&self) -> FloorMap {
        FloorMap::three_stop(
            self.ground_height,
            self.middle_height,
            self.top_height,
            self.floor_tolerance,
        )
    }
}
