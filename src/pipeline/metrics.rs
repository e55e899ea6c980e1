// src/pipeline/metrics.rs
//
// Per-run counters. The handle is cheap to clone so a supervisor can read
// live numbers while the run's own thread writes them.

use crate::behavior::BehaviorLabel;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RunMetrics {
    pub frames_processed: Arc<AtomicU64>,
    pub frames_with_subjects: Arc<AtomicU64>,
    pub observations: Arc<AtomicU64>,
    pub walking: Arc<AtomicU64>,
    pub resting: Arc<AtomicU64>,
    pub standing: Arc<AtomicU64>,
    pub unknown: Arc<AtomicU64>,
    pub interactions: Arc<AtomicU64>,
    pub collapsed_ids: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            frames_processed: Arc::new(AtomicU64::new(0)),
            frames_with_subjects: Arc::new(AtomicU64::new(0)),
            observations: Arc::new(AtomicU64::new(0)),
            walking: Arc::new(AtomicU64::new(0)),
            resting: Arc::new(AtomicU64::new(0)),
            standing: Arc::new(AtomicU64::new(0)),
            unknown: Arc::new(AtomicU64::new(0)),
            interactions: Arc::new(AtomicU64::new(0)),
            collapsed_ids: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_label(&self, label: BehaviorLabel) {
        self.inc(&self.observations);
        let counter = match label {
            BehaviorLabel::Walking => &self.walking,
            BehaviorLabel::Resting => &self.resting,
            BehaviorLabel::Standing => &self.standing,
            BehaviorLabel::Unknown => &self.unknown,
        };
        self.inc(counter);
    }

    pub fn record_frame(&self, subjects: usize, interactions: usize, duration_us: u64) {
        self.inc(&self.frames_processed);
        if subjects > 0 {
            self.inc(&self.frames_with_subjects);
        }
        self.interactions
            .fetch_add(interactions as u64, Ordering::Relaxed);
        self.frame_time_us.store(duration_us, Ordering::Relaxed);
    }

    pub fn set_collapsed_ids(&self, count: u64) {
        self.collapsed_ids.store(count, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.frames_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_with_subjects: self.frames_with_subjects.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
            walking: self.walking.load(Ordering::Relaxed),
            resting: self.resting.load(Ordering::Relaxed),
            standing: self.standing.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            interactions: self.interactions.load(Ordering::Relaxed),
            collapsed_ids: self.collapsed_ids.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub frames_with_subjects: u64,
    pub observations: u64,
    pub walking: u64,
    pub resting: u64,
    pub standing: u64,
    pub unknown: u64,
    pub interactions: u64,
    pub collapsed_ids: u64,
    pub last_frame_us: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_histogram() {
        let metrics = RunMetrics::new();
        metrics.record_label(BehaviorLabel::Walking);
        metrics.record_label(BehaviorLabel::Walking);
        metrics.record_label(BehaviorLabel::Unknown);

        let summary = metrics.summary();
        assert_eq!(summary.observations, 3);
        assert_eq!(summary.walking, 2);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.resting, 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = RunMetrics::new();
        let observer = metrics.clone();
        metrics.record_frame(2, 1, 1500);
        metrics.record_frame(0, 0, 900);
        let summary = observer.summary();
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.frames_with_subjects, 1);
        assert_eq!(summary.interactions, 1);
        assert_eq!(summary.last_frame_us, 900);
    }
}
