// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub classifier: ClassifierConfig,
    pub detection: DetectionConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on tracked slots; external ids above it share the last slot
    pub max_slots: u32,
    /// Candidate labels kept per identity
    pub history_window: usize,
    /// Votes a label needs inside the window before it replaces the output
    pub state_change_threshold: usize,
    /// Centroid displacement (working-resolution px) above which a subject is moving
    pub movement_threshold: f64,
    /// Centroid distance (working-resolution px) under which two subjects interact
    pub interaction_distance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_slots: 2,
            history_window: 5,
            state_change_threshold: 3,
            movement_threshold: 15.0,
            interaction_distance: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub walking_min_aspect: f64,
    pub resting_min_solidity: f64,
    pub resting_min_shape_ratio: f64,
    pub standing_max_aspect: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            walking_min_aspect: 1.2,
            resting_min_solidity: 0.75,
            resting_min_shape_ratio: 0.6,
            standing_max_aspect: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// COCO class id of the subject (15 = cat)
    pub target_class: u32,
    pub confidence_threshold: f32,
    /// Pre-computed tracker output replayed by `ReplayTracker`
    pub detections_path: Option<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            target_class: 15,
            confidence_threshold: 0.5,
            detections_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub resize_factor: f64,
    /// Used when the source does not report a frame rate
    pub fallback_fps: f64,
    pub save_annotated: bool,
    pub font_path: Option<String>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            input_dir: "media/uploads".to_string(),
            output_dir: "media/processed".to_string(),
            resize_factor: 0.5,
            fallback_fps: 30.0,
            save_annotated: true,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "cattax=info".to_string(),
        }
    }
}

/// Interleaved RGB8 frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

/// Centroid in working-resolution pixels, truncated like the moment ratio it comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Centroid {
    pub x: i32,
    pub y: i32,
}

impl Centroid {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Centroid) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}
