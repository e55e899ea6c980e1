// src/detection/mod.rs
//
// Contract with the external detector/tracker. The model itself (instance
// segmentation with persistent track ids) lives outside this crate; the
// orchestrator only sees `SegmentationTracker`.

mod replay;
mod slots;

pub use replay::{ReplayDetection, ReplayFrame, ReplayTracker};
pub use slots::SlotMapper;

use crate::mask::RegionMask;
use crate::types::Frame;
use anyhow::Result;

/// Class and confidence gate applied to tracker output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    pub class_id: u32,
    pub min_confidence: f32,
}

impl DetectionFilter {
    pub fn accepts(&self, class_id: u32, confidence: f32) -> bool {
        class_id == self.class_id && confidence > self.min_confidence
    }
}

/// One tracked instance on one frame.
#[derive(Debug, Clone)]
pub struct TrackedRegion {
    /// Stable across frames for the same subject; otherwise opaque
    pub track_id: i64,
    pub class_id: u32,
    pub confidence: f32,
    pub mask: RegionMask,
}

/// Per-frame instance segmentation with identity persistence.
///
/// Implementations keep their own tracking state between calls, so one
/// instance must serve exactly one run. An empty result is a normal
/// "nothing detected" frame; `Err` aborts the run.
pub trait SegmentationTracker: Send {
    fn track(
        &mut self,
        frame: &Frame,
        frame_index: u64,
        filter: &DetectionFilter,
    ) -> Result<Vec<TrackedRegion>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_requires_class_and_confidence() {
        let filter = DetectionFilter {
            class_id: 15,
            min_confidence: 0.5,
        };
        assert!(filter.accepts(15, 0.8));
        assert!(!filter.accepts(16, 0.8));
        assert!(!filter.accepts(15, 0.3));
        assert!(!filter.accepts(15, 0.5));
    }
}
