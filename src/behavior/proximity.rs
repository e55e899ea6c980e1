// src/behavior/proximity.rs

use crate::types::Centroid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub slot_a: u32,
    pub slot_b: u32,
    pub distance: f64,
}

/// Pairs of distinct slots whose centroids are closer than `max_distance`
/// on the same frame. Detections collapsed onto the same slot are not paired.
pub fn interacting_pairs(positions: &[(u32, Centroid)], max_distance: f64) -> Vec<Interaction> {
    let mut pairs = Vec::new();
    for (i, (slot_a, a)) in positions.iter().enumerate() {
        for (slot_b, b) in positions.iter().skip(i + 1) {
            if slot_a == slot_b {
                continue;
            }
            let distance = a.distance_to(b);
            if distance < max_distance {
                let (lo, hi) = if slot_a < slot_b {
                    (*slot_a, *slot_b)
                } else {
                    (*slot_b, *slot_a)
                };
                pairs.push(Interaction {
                    slot_a: lo,
                    slot_b: hi,
                    distance,
                });
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_pair_detected() {
        let pairs = interacting_pairs(
            &[(2, Centroid::new(100, 100)), (1, Centroid::new(130, 140))],
            100.0,
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].slot_a, pairs[0].slot_b), (1, 2));
        assert_eq!(pairs[0].distance, 50.0);
    }

    #[test]
    fn test_distance_limit_is_strict() {
        // 60-80-100 triangle
        let pairs = interacting_pairs(
            &[(1, Centroid::new(0, 0)), (2, Centroid::new(60, 80))],
            100.0,
        );
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_same_slot_not_paired() {
        let pairs = interacting_pairs(
            &[(2, Centroid::new(0, 0)), (2, Centroid::new(5, 5))],
            100.0,
        );
        assert!(pairs.is_empty());
    }
}
