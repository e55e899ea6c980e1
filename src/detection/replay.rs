// src/detection/replay.rs
//
// Replays tracker output recorded offline (one JSON object per frame):
//
//   {"frame": 0, "detections": [{"track_id": 1, "class_id": 15,
//     "confidence": 0.91, "polygon": [[x, y], ...]}]}
//
// Coordinates are in working-resolution pixels. Frames absent from the
// file have no detections.

use super::{DetectionFilter, SegmentationTracker, TrackedRegion};
use crate::mask::PolygonMask;
use crate::types::Frame;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDetection {
    pub track_id: i64,
    pub class_id: u32,
    pub confidence: f32,
    pub polygon: PolygonMask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub frame: u64,
    #[serde(default)]
    pub detections: Vec<ReplayDetection>,
}

pub struct ReplayTracker {
    frames: HashMap<u64, Vec<ReplayDetection>>,
}

impl ReplayTracker {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open detections file {}", path.display()))?;
        let tracker = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to load detections from {}", path.display()))?;
        info!(
            "Loaded replayed detections for {} frame(s) from {}",
            tracker.frames.len(),
            path.display()
        );
        Ok(tracker)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames: HashMap<u64, Vec<ReplayDetection>> = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: ReplayFrame = serde_json::from_str(&line)
                .with_context(|| format!("Malformed detection record on line {}", line_no + 1))?;
            frames
                .entry(record.frame)
                .or_default()
                .extend(record.detections);
        }
        Ok(Self { frames })
    }

    pub fn from_frames(frames: Vec<ReplayFrame>) -> Self {
        let mut map: HashMap<u64, Vec<ReplayDetection>> = HashMap::new();
        for f in frames {
            map.entry(f.frame).or_default().extend(f.detections);
        }
        Self { frames: map }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl SegmentationTracker for ReplayTracker {
    fn track(
        &mut self,
        _frame: &Frame,
        frame_index: u64,
        filter: &DetectionFilter,
    ) -> Result<Vec<TrackedRegion>> {
        let regions: Vec<TrackedRegion> = self
            .frames
            .get(&frame_index)
            .map(|dets| {
                dets.iter()
                    .filter(|d| filter.accepts(d.class_id, d.confidence))
                    .map(|d| TrackedRegion {
                        track_id: d.track_id,
                        class_id: d.class_id,
                        confidence: d.confidence,
                        mask: d.polygon.clone().into(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!("Frame {}: {} replayed region(s)", frame_index, regions.len());
        Ok(regions)
    }
}
