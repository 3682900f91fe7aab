use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One distance/temperature sample from the rangefinder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Measurement {
    pub height: f64,
    pub temperature: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    pub fn new(height: f64, temperature: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Measurement {
            height,
            temperature,
            timestamp,
        }
    }
}

/// Bounded FIFO of the most recent measurements.
///
/// All motion, floor, and staleness decisions are made over this window.
/// Mutation is append-and-evict only: pushing past capacity drops the oldest
/// sample.
#[derive(Clone, Debug)]
pub struct Window {
    samples: VecDeque<Measurement>,
    capacity: usize,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        Window {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, m: Measurement) {
        self.samples.push_back(m);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample, if any.
    pub fn latest(&self) -> Option<&Measurement> {
        self.samples.back()
    }

    /// Sample just before the newest one.
    pub fn previous(&self) -> Option<&Measurement> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        self.samples.get(n - 2)
    }

    /// Oldest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.samples.iter()
    }
}
