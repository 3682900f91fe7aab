use serde::{Deserialize, Serialize};

use crate::measurement::Window;

/// A known floor stop: the height the car rests at, plus the band around it
/// that still counts as "at this floor".
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FloorLandmark {
    pub id: usize,
    pub height: f64,
    pub tolerance: f64,
}

impl FloorLandmark {
    pub fn new(id: usize, height: f64, tolerance: f64) -> Self {
        FloorLandmark {
            id,
            height,
            tolerance,
        }
    }

    fn matches(&self, height: f64) -> bool {
        (height - self.height).abs() < self.tolerance
    }
}

/// Ordered table of floor landmarks, checked in declared priority order.
///
/// Landmarks are expected to be spaced farther apart than twice the
/// tolerance; overlapping bands are a configuration mistake and only the
/// earlier landmark would ever match.
#[derive(Clone, Debug)]
pub struct FloorMap {
    landmarks: Vec<FloorLandmark>,
}

impl FloorMap {
    pub fn new(landmarks: Vec<FloorLandmark>) -> Self {
        for pair in landmarks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if (a.height - b.height).abs() < a.tolerance + b.tolerance {
                log::warn!(
                    "floor landmarks {} and {} have overlapping tolerance bands",
                    a.id,
                    b.id
                );
            }
        }
        FloorMap { landmarks }
    }

    /// Ground / middle / top at the given heights with a shared tolerance.
    pub fn three_stop(ground: f64, middle: f64, top: f64, tolerance: f64) -> Self {
        FloorMap::new(vec![
            FloorLandmark::new(0, ground, tolerance),
            FloorLandmark::new(1, middle, tolerance),
            FloorLandmark::new(2, top, tolerance),
        ])
    }

    /// First landmark whose band strictly contains the height, if any.
    pub fn at_floor(&self, height: f64) -> Option<usize> {
        self.landmarks
            .iter()
            .find(|lm| lm.matches(height))
            .map(|lm| lm.id)
    }

    /// Floor match for the newest sample in the window.
    pub fn locate(&self, window: &Window) -> Option<usize> {
        window.latest().and_then(|m| self.at_floor(m.height))
    }

    pub fn is_between_floors(&self, window: &Window) -> bool {
        self.locate(window).is_none()
    }

    pub fn landmarks(&self) -> &[FloorLandmark] {
        &self.landmarks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::test_support::window_from;

    fn map() -> FloorMap {
        FloorMap::three_stop(0.0, 290.0, 544.0, 6.0)
    }

    #[test]
    fn test_match_within_tolerance() {
        assert_eq!(map().at_floor(0.0), Some(0));
        assert_eq!(map().at_floor(292.0), Some(1));
        assert_eq!(map().at_floor(548.0), Some(2));
    }

    #[test]
    fn test_tolerance_edge_is_strict() {
        let m = map();
        // Exactly on the band edge does not match.
        assert_eq!(m.at_floor(6.0), None);
        assert_eq!(m.at_floor(-6.0), None);
        // Just inside does.
        assert_eq!(m.at_floor(5.9), Some(0));
    }

    #[test]
    fn test_no_match_between_floors() {
        assert_eq!(map().at_floor(150.0), None);
    }

    #[test]
    fn test_priority_order_on_overlap() {
        // Degenerate overlapping configuration: the earlier landmark wins.
        let m = FloorMap::new(vec![
            FloorLandmark::new(0, 0.0, 10.0),
            FloorLandmark::new(1, 5.0, 10.0),
        ]);
        assert_eq!(m.at_floor(4.0), Some(0));
    }

    #[test]
    fn test_locate_uses_newest_sample() {
        let w = window_from(&[(0, 150.0), (1, 544.0)]);
        assert_eq!(map().locate(&w), Some(2));
        assert!(!map().is_between_floors(&w));
    }

    #[test]
    fn test_empty_window_is_between_floors() {
        let w = window_from(&[]);
        assert_eq!(map().locate(&w), None);
        assert!(map().is_between_floors(&w));
    }
}
