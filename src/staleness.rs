use crate::measurement::Window;

/// Detects a rangefinder that has stopped producing new values.
///
/// A healthy sensor at rest still jitters below the motion threshold; the
/// exact same height across the whole observed history means the driver is
/// stuck and needs a reset.
#[derive(Clone, Copy, Debug)]
pub struct StalenessWatchdog {
    /// Samples required before a staleness verdict is possible.
    pub min_samples: usize,
}

impl StalenessWatchdog {
    pub fn new(min_samples: usize) -> Self {
        StalenessWatchdog { min_samples }
    }

    /// True iff the window holds at least `min_samples` readings and every
    /// height equals the first. Any single differing value disqualifies.
    pub fn is_stale(&self, window: &Window) -> bool {
        if window.len() < self.min_samples {
            return false;
        }
        let mut heights = window.iter().map(|m| m.height);
        match heights.next() {
            Some(first) => heights.all(|h| h == first),
            None => false,
        }
    }
}
