// src/behavior/classifier.rs
//
// Single-frame behavior decision from silhouette shape plus motion.
// First matching rule wins:
//
//   moving && wide             → Walking
//   solid && rounded           → Resting   (curled up)
//   markedly tall / narrow     → Standing
//   otherwise                  → Resting
//
// Unknown is never produced here; it is reserved for extraction failures
// upstream of the classifier.

use super::motion::MotionSample;
use super::shape_features::ShapeFeatures;
use crate::types::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorLabel {
    Walking,
    Resting,
    Standing,
    Unknown,
}

impl BehaviorLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorLabel::Walking => "walking",
            BehaviorLabel::Resting => "resting",
            BehaviorLabel::Standing => "standing",
            BehaviorLabel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorClassifier {
    config: ClassifierConfig,
}

impl Default for BehaviorClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl BehaviorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, shape: &ShapeFeatures, motion: &MotionSample) -> BehaviorLabel {
        let c = &self.config;

        if motion.is_moving && shape.aspect_ratio > c.walking_min_aspect {
            return BehaviorLabel::Walking;
        }
        if shape.solidity > c.resting_min_solidity && shape.shape_ratio > c.resting_min_shape_ratio
        {
            return BehaviorLabel::Resting;
        }
        if shape.aspect_ratio < c.standing_max_aspect {
            return BehaviorLabel::Standing;
        }
        BehaviorLabel::Resting
    }
}
