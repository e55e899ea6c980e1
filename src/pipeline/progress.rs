// src/pipeline/progress.rs
//
// What a run reports while and after it processes frames. The result
// sequence is append-only: after frame k has been published the sequence
// holds exactly k + 1 entries.

use crate::behavior::{BehaviorLabel, Interaction};
use crate::types::Centroid;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One identity on one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectBehavior {
    pub slot_id: u32,
    pub behavior: BehaviorLabel,
    /// None only when extraction failed before a centroid existed
    pub position: Option<Centroid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame: u64,
    pub subjects: Vec<SubjectBehavior>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interactions: Vec<Interaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalReport {
    pub run_id: String,
    pub status: RunStatus,
    pub progress: f64,
    pub total_frames: u64,
    pub processed_frames: u64,
    pub frames: Vec<FrameResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Annotated output location; set only on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Receives incremental and terminal run state.
///
/// `publish` is called once per processed frame, in frame order;
/// `publish_terminal` exactly once when the run ends. The orchestrator does
/// not retry: a sink that needs delivery guarantees provides them itself.
pub trait ProgressSink: Send {
    fn publish(&mut self, progress: f64, results: &[FrameResult]) -> Result<()>;
    fn publish_terminal(&mut self, report: &TerminalReport) -> Result<()>;
}

/// Percentage of declared frames processed, clamped to [0, 100]; exactly
/// 100 once `processed` reaches `total`. An unknown total (0) reports 0
/// until the terminal state.
pub fn progress_percent(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    if processed >= total {
        return 100.0;
    }
    (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_reaches_exactly_100_on_last_frame() {
        // 1/3 steps do not sum to 100 in floating point
        assert_eq!(progress_percent(3, 3), 100.0);
        assert_eq!(progress_percent(7, 7), 100.0);
        assert!(progress_percent(2, 3) < 100.0);
    }

    #[test]
    fn test_progress_clamped_when_container_undercounts() {
        assert_eq!(progress_percent(12, 10), 100.0);
    }

    #[test]
    fn test_progress_unknown_total_is_zero() {
        assert_eq!(progress_percent(5, 0), 0.0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut last = 0.0;
        for i in 1..=997 {
            let p = progress_percent(i, 997);
            assert!(p >= last);
            last = p;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_frame_result_json_shape() {
        let result = FrameResult {
            frame: 3,
            subjects: vec![SubjectBehavior {
                slot_id: 1,
                behavior: BehaviorLabel::Walking,
                position: Some(Centroid::new(120, 80)),
            }],
            interactions: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["subjects"][0]["behavior"], "walking");
        assert_eq!(json["subjects"][0]["position"]["x"], 120);
        assert!(json.get("interactions").is_none());
    }
}
