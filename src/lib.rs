//! liftwatch tracks an elevator car from a stream of rangefinder samples,
//! classifies its motion, and fans the transitions out to playback, a live
//! feed, and a metrics sink.
//!
//! The decision core ([`tracker::Tracker`] and the components it sequences)
//! is pure computation over a bounded sample window; all I/O lives in the
//! injectable backends around it.

pub mod config;
pub mod feed;
pub mod floors;
pub mod gate;
pub mod measurement;
pub mod motion;
pub mod persistence;
pub mod playback;
pub mod sensors;
pub mod staleness;
pub mod status;
pub mod tracker;

pub use config::TrackerConfig;
pub use measurement::{Measurement, Window};
pub use motion::{MotionClassifier, MotionState};
pub use tracker::{Collaborators, CycleOutcome, Intent, Tracker};
