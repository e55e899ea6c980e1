// src/behavior/analyzer.rs
//
// Per-run owner of all identity state. One `TrackedIdentity` per slot,
// created lazily on first successful observation and dropped with the
// analyzer when the run ends.
//
// observe_region() is the recoverable-error boundary: any extraction
// failure for one identity on one frame becomes `Unknown` for that
// identity/frame only. A failed observation leaves the identity's motion
// and history state untouched.

use super::classifier::{BehaviorClassifier, BehaviorLabel};
use super::motion::{MotionEstimator, MotionSample};
use super::shape_features::ShapeFeatures;
use super::smoother::BehaviorSmoother;
use crate::errors::ExtractionError;
use crate::geometry::{moments, Contour};
use crate::mask::{external_contour, RegionMask};
use crate::types::{AnalysisConfig, Centroid, ClassifierConfig};
use std::collections::BTreeMap;
use tracing::debug;

pub struct TrackedIdentity {
    pub slot_id: u32,
    motion: MotionEstimator,
    smoother: BehaviorSmoother,
    observations: u64,
}

impl TrackedIdentity {
    fn new(slot_id: u32, config: &AnalysisConfig) -> Self {
        Self {
            slot_id,
            motion: MotionEstimator::new(config.movement_threshold),
            smoother: BehaviorSmoother::new(config.history_window, config.state_change_threshold),
            observations: 0,
        }
    }

    pub fn previous_centroid(&self) -> Option<Centroid> {
        self.motion.previous()
    }

    pub fn history(&self) -> Vec<BehaviorLabel> {
        self.smoother.history().copied().collect()
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }
}

/// Everything learned about one identity on one frame.
#[derive(Debug, Clone)]
pub struct IdentityObservation {
    pub slot_id: u32,
    pub label: BehaviorLabel,
    /// Raw single-frame decision before smoothing; None when extraction failed
    pub candidate: Option<BehaviorLabel>,
    pub centroid: Option<Centroid>,
    pub contour: Option<Contour>,
    pub features: Option<ShapeFeatures>,
    pub motion: Option<MotionSample>,
    pub error: Option<ExtractionError>,
}

pub struct BehaviorAnalyzer {
    identities: BTreeMap<u32, TrackedIdentity>,
    classifier: BehaviorClassifier,
    config: AnalysisConfig,
}

impl BehaviorAnalyzer {
    pub fn new(config: AnalysisConfig, classifier: ClassifierConfig) -> Self {
        Self {
            identities: BTreeMap::new(),
            classifier: BehaviorClassifier::new(classifier),
            config,
        }
    }

    /// Mask → contour → centroid → features → motion → candidate → smoothed label.
    pub fn observe_region(
        &mut self,
        slot_id: u32,
        mask: &RegionMask,
        width: u32,
        height: u32,
    ) -> IdentityObservation {
        match external_contour(mask, width, height) {
            Ok(contour) => self.observe_contour(slot_id, contour),
            Err(e) => self.unknown(slot_id, None, None, e),
        }
    }

    pub fn observe_contour(&mut self, slot_id: u32, contour: Contour) -> IdentityObservation {
        let centroid = match moments(&contour).centroid() {
            Some((x, y)) => Centroid::new(x, y),
            None => return self.unknown(slot_id, None, Some(contour), ExtractionError::ZeroArea),
        };

        let features = match ShapeFeatures::extract(&contour) {
            Ok(f) => f,
            Err(e) => return self.unknown(slot_id, Some(centroid), Some(contour), e),
        };

        let config = &self.config;
        let identity = self
            .identities
            .entry(slot_id)
            .or_insert_with(|| TrackedIdentity::new(slot_id, config));

        let motion = identity.motion.update(centroid);
        let candidate = self.classifier.classify(&features, &motion);
        let label = identity.smoother.smooth(candidate);
        identity.observations += 1;

        debug!(
            "slot {}: candidate={} label={} aspect={:.2} solidity={:.2} shape={:.2} moved={:.1}px",
            slot_id,
            candidate,
            label,
            features.aspect_ratio,
            features.solidity,
            features.shape_ratio,
            motion.displacement
        );

        IdentityObservation {
            slot_id,
            label,
            candidate: Some(candidate),
            centroid: Some(centroid),
            contour: Some(contour),
            features: Some(features),
            motion: Some(motion),
            error: None,
        }
    }

    fn unknown(
        &self,
        slot_id: u32,
        centroid: Option<Centroid>,
        contour: Option<Contour>,
        error: ExtractionError,
    ) -> IdentityObservation {
        debug!("slot {}: extraction failed ({}), label unknown", slot_id, error);
        IdentityObservation {
            slot_id,
            label: BehaviorLabel::Unknown,
            candidate: None,
            centroid,
            contour,
            features: None,
            motion: None,
            error: Some(error),
        }
    }

    pub fn identity(&self, slot_id: u32) -> Option<&TrackedIdentity> {
        self.identities.get(&slot_id)
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn analyzer() -> BehaviorAnalyzer {
        BehaviorAnalyzer::new(AnalysisConfig::default(), ClassifierConfig::default())
    }

    /// Axis-aligned box contour, w x h inclusive pixel extents.
    fn box_at(x: i32, y: i32, w: i32, h: i32) -> Contour {
        vec![
            Point::new(x, y),
            Point::new(x + w - 1, y),
            Point::new(x + w - 1, y + h - 1),
            Point::new(x, y + h - 1),
        ]
    }

    #[test]
    fn test_moving_wide_subject_walks_from_first_frame() {
        let mut a = analyzer();
        // 60x40 box: aspect 1.5, moving 30 px per frame after the first
        let labels: Vec<_> = (0..3)
            .map(|i| a.observe_contour(1, box_at(i * 30, 50, 60, 40)))
            .collect();

        // First frame has no previous centroid, so it is a resting candidate
        assert_eq!(labels[0].candidate, Some(BehaviorLabel::Resting));
        assert_eq!(labels[1].candidate, Some(BehaviorLabel::Walking));
        assert_eq!(labels[2].candidate, Some(BehaviorLabel::Walking));
        assert_eq!(labels[1].label, BehaviorLabel::Walking);
        assert_eq!(labels[2].label, BehaviorLabel::Walking);
    }

    #[test]
    fn test_identities_are_independent() {
        let mut a = analyzer();
        a.observe_contour(1, box_at(0, 0, 60, 40));
        a.observe_contour(2, box_at(500, 500, 60, 40));
        let obs = a.observe_contour(1, box_at(40, 0, 60, 40));
        assert!(obs.motion.unwrap().is_moving);

        let obs = a.observe_contour(2, box_at(500, 500, 60, 40));
        assert!(!obs.motion.unwrap().is_moving);
        assert_eq!(a.identity_count(), 2);
        assert_eq!(a.identity(1).unwrap().observations(), 2);
    }

    #[test]
    fn test_zero_area_contour_is_unknown_and_leaves_state() {
        let mut a = analyzer();
        a.observe_contour(1, box_at(10, 10, 30, 30));
        let before = a.identity(1).unwrap().previous_centroid();

        let line = vec![Point::new(0, 0), Point::new(50, 0), Point::new(100, 0)];
        let obs = a.observe_contour(1, line);
        assert_eq!(obs.label, BehaviorLabel::Unknown);
        assert_eq!(obs.error, Some(ExtractionError::ZeroArea));
        assert!(obs.centroid.is_none());

        let identity = a.identity(1).unwrap();
        assert_eq!(identity.previous_centroid(), before);
        assert_eq!(identity.history().len(), 1);
    }

    #[test]
    fn test_degenerate_mask_is_unknown() {
        let mut a = analyzer();
        let mask = RegionMask::polygon([(3.0, 3.0), (3.2, 3.9)]);
        let obs = a.observe_region(2, &mask, 100, 100);
        assert_eq!(obs.label, BehaviorLabel::Unknown);
        assert!(obs.error.is_some());
        assert!(a.identity(2).is_none());
    }

    #[test]
    fn test_history_bounded_over_long_run() {
        let mut a = analyzer();
        for i in 0..500 {
            let x = (i % 7) * 25;
            a.observe_contour(1, box_at(x, 0, 30 + (i % 40), 30));
            assert!(a.identity(1).unwrap().history().len() <= 5);
        }
    }
}
