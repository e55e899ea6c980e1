// src/behavior/motion.rs

use crate::types::Centroid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub is_moving: bool,
    /// Euclidean centroid displacement since the previous observation, px
    pub displacement: f64,
}

/// Frame-to-frame centroid displacement for a single identity.
///
/// Thresholding happens in working-resolution pixels, so the same threshold
/// means a larger physical movement when the frame is downscaled.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    previous: Option<Centroid>,
    threshold: f64,
}

impl MotionEstimator {
    pub fn new(threshold: f64) -> Self {
        Self {
            previous: None,
            threshold,
        }
    }

    /// Compare against the stored centroid, then store `current`.
    /// Must be called at most once per frame for this identity.
    pub fn update(&mut self, current: Centroid) -> MotionSample {
        let sample = match self.previous {
            None => MotionSample {
                is_moving: false,
                displacement: 0.0,
            },
            Some(prev) => {
                let displacement = current.distance_to(&prev);
                MotionSample {
                    is_moving: displacement > self.threshold,
                    displacement,
                }
            }
        };
        self.previous = Some(current);
        sample
    }

    pub fn previous(&self) -> Option<Centroid> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_not_moving() {
        let mut m = MotionEstimator::new(15.0);
        let s = m.update(Centroid::new(100, 100));
        assert!(!s.is_moving);
        assert_eq!(s.displacement, 0.0);
        assert_eq!(m.previous(), Some(Centroid::new(100, 100)));
    }

    #[test]
    fn test_unchanged_centroid_has_zero_displacement() {
        let mut m = MotionEstimator::new(15.0);
        m.update(Centroid::new(40, 60));
        let s = m.update(Centroid::new(40, 60));
        assert!(!s.is_moving);
        assert_eq!(s.displacement, 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut m = MotionEstimator::new(15.0);
        m.update(Centroid::new(0, 0));
        // 9-12-15 triangle: exactly on the threshold
        let s = m.update(Centroid::new(9, 12));
        assert_eq!(s.displacement, 15.0);
        assert!(!s.is_moving);

        let s = m.update(Centroid::new(9, 28));
        assert!(s.is_moving);
    }

    #[test]
    fn test_previous_updates_even_when_still() {
        let mut m = MotionEstimator::new(15.0);
        m.update(Centroid::new(0, 0));
        m.update(Centroid::new(10, 0));
        m.update(Centroid::new(20, 0));
        // Each step is 10 px: accumulating from the first point would cross 15
        let s = m.update(Centroid::new(30, 0));
        assert!(!s.is_moving);
        assert_eq!(m.previous(), Some(Centroid::new(30, 0)));
    }
}
