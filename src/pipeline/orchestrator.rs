// src/pipeline/orchestrator.rs
//
// One run = one input video, processed strictly in frame order:
//
//   read → resize → track → (per region) slot → analyzer → annotate
//        → sink.write → append result → publish progress
//
// All identity state lives in a BehaviorAnalyzer created inside the run and
// dropped when it ends. Source and sink are released exactly once on every
// exit path, before the terminal state is published.

use super::cancel::CancellationToken;
use super::metrics::{MetricsSummary, RunMetrics};
use super::progress::{
    progress_percent, FrameResult, ProgressSink, RunStatus, SubjectBehavior, TerminalReport,
};
use super::resources::Scoped;
use crate::behavior::{interacting_pairs, BehaviorAnalyzer};
use crate::detection::{DetectionFilter, SegmentationTracker, SlotMapper};
use crate::errors::RunError;
use crate::types::{Centroid, Config};
use crate::video::{
    resize_frame, slot_color, working_size, Annotation, MediaBackend, SinkSpec, VideoSink,
    VideoSource,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span};

const LOG_EVERY_FRAMES: u64 = 100;

/// What a finished (completed or cancelled) run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    /// Declared by the source; may differ from `processed_frames`
    pub total_frames: u64,
    pub processed_frames: u64,
    pub results: Vec<FrameResult>,
    pub output: Option<String>,
    pub metrics: MetricsSummary,
}

enum LoopEnd {
    Exhausted,
    Cancelled,
}

#[derive(Default)]
struct RunState {
    total: u64,
    processed: u64,
    progress: f64,
    results: Vec<FrameResult>,
}

pub struct BehaviorRun {
    run_id: String,
    input: PathBuf,
    config: Config,
    backend: Arc<dyn MediaBackend>,
    tracker: Box<dyn SegmentationTracker>,
    progress: Box<dyn ProgressSink>,
    cancel: CancellationToken,
    metrics: RunMetrics,
}

impl BehaviorRun {
    pub fn new(
        run_id: impl Into<String>,
        input: impl Into<PathBuf>,
        config: Config,
        backend: Arc<dyn MediaBackend>,
        tracker: Box<dyn SegmentationTracker>,
        progress: Box<dyn ProgressSink>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            input: input.into(),
            config,
            backend,
            tracker,
            progress,
            cancel: CancellationToken::new(),
            metrics: RunMetrics::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Live counters for this run.
    pub fn metrics(&self) -> RunMetrics {
        self.metrics.clone()
    }

    /// Runs to completion, cancellation or failure. Failures are published
    /// as terminal `failed` and then returned.
    pub fn execute(mut self) -> Result<RunSummary> {
        let span = info_span!("run", id = %self.run_id);
        let _enter = span.enter();
        info!("Starting run on {}", self.input.display());

        let mut state = RunState::default();
        let outcome = self.drive(&mut state);

        let (status, output, error) = match &outcome {
            Ok((LoopEnd::Exhausted, output)) => {
                state.progress = 100.0;
                (RunStatus::Completed, output.clone(), None)
            }
            Ok((LoopEnd::Cancelled, _)) => (RunStatus::Cancelled, None, None),
            Err(e) => {
                error!("Run failed after {} frame(s): {:#}", state.processed, e);
                (RunStatus::Failed, None, Some(format!("{:#}", e)))
            }
        };

        let report = TerminalReport {
            run_id: self.run_id.clone(),
            status,
            progress: state.progress,
            total_frames: state.total,
            processed_frames: state.processed,
            frames: state.results,
            error,
            output,
            finished_at: Utc::now(),
        };
        let published = self.progress.publish_terminal(&report);

        let metrics = self.metrics.summary();
        info!(
            "Run {}: {}/{} frame(s), {} observation(s) ({} unknown), {:.1} FPS",
            status.as_str(),
            report.processed_frames,
            report.total_frames,
            metrics.observations,
            metrics.unknown,
            metrics.fps
        );

        if let Err(e) = outcome {
            if let Err(p) = published {
                error!("Failed to publish terminal state: {:#}", p);
            }
            return Err(e);
        }

        published.map_err(|e| RunError::Publish {
            frame: report.processed_frames,
            reason: format!("{:#}", e),
        })?;

        Ok(RunSummary {
            run_id: report.run_id,
            status,
            total_frames: report.total_frames,
            processed_frames: report.processed_frames,
            results: report.frames,
            output: report.output,
            metrics,
        })
    }

    fn drive(&mut self, state: &mut RunState) -> Result<(LoopEnd, Option<String>)> {
        let source = self.backend.open_source(&self.input)?;
        let mut source = Scoped::new("video source", source);

        let props = source.properties();
        state.total = props.frame_count;
        let (width, height) =
            working_size(props.width, props.height, self.config.video.resize_factor);
        let fps = if props.fps > 0.0 {
            props.fps
        } else {
            self.config.video.fallback_fps
        };
        info!(
            "Working resolution {}x{} @ {:.1} FPS, {} frame(s) declared",
            width, height, fps, props.frame_count
        );

        let sink = self
            .backend
            .create_sink(&SinkSpec {
                run_id: self.run_id.clone(),
                width,
                height,
                fps,
            })
            .context("Failed to create video sink")?;
        let mut sink = Scoped::new("video sink", sink);

        let end = self.frame_loop(&mut source, &mut sink, width, height, state);

        let output = sink.output_ref();
        source.release();
        sink.release();

        end.map(|e| (e, output))
    }

    fn frame_loop(
        &mut self,
        source: &mut Scoped<Box<dyn VideoSource>>,
        sink: &mut Scoped<Box<dyn VideoSink>>,
        width: u32,
        height: u32,
        state: &mut RunState,
    ) -> Result<LoopEnd> {
        let analysis = self.config.analysis.clone();
        let mut analyzer = BehaviorAnalyzer::new(analysis.clone(), self.config.classifier.clone());
        let mut slots = SlotMapper::new(analysis.max_slots);
        let filter = DetectionFilter {
            class_id: self.config.detection.target_class,
            min_confidence: self.config.detection.confidence_threshold,
        };

        let mut frame_index: u64 = 0;
        loop {
            if self.cancel.is_cancelled() {
                info!("Cancelled before frame {}", frame_index);
                return Ok(LoopEnd::Cancelled);
            }

            let frame = source.read_frame().map_err(|e| RunError::SourceRead {
                frame: frame_index,
                reason: format!("{:#}", e),
            })?;
            let frame = match frame {
                Some(f) => f,
                None => break,
            };

            if frame_index % LOG_EVERY_FRAMES == 0 {
                info!("Processing frame {}/{}", frame_index, state.total);
            }
            let started = Instant::now();

            let frame = resize_frame(&frame, width, height).map_err(|e| RunError::SourceRead {
                frame: frame_index,
                reason: format!("{:#}", e),
            })?;

            let regions = self
                .tracker
                .track(&frame, frame_index, &filter)
                .map_err(|e| RunError::Detector {
                    frame: frame_index,
                    reason: format!("{:#}", e),
                })?;

            let mut subjects = Vec::with_capacity(regions.len());
            let mut annotations = Vec::with_capacity(regions.len());
            for region in &regions {
                let slot_id = slots.slot_for(region.track_id);
                let obs = analyzer.observe_region(slot_id, &region.mask, width, height);
                self.metrics.record_label(obs.label);

                subjects.push(SubjectBehavior {
                    slot_id,
                    behavior: obs.label,
                    position: obs.centroid,
                });
                annotations.push(Annotation {
                    slot_id,
                    label: obs.label,
                    outline: obs.contour,
                    anchor: obs.centroid,
                    color: slot_color(slot_id),
                });
            }

            let positions: Vec<(u32, Centroid)> = subjects
                .iter()
                .filter_map(|s| s.position.map(|p| (s.slot_id, p)))
                .collect();
            let interactions = interacting_pairs(&positions, analysis.interaction_distance);

            sink.write_frame(&frame, &annotations)
                .map_err(|e| RunError::Sink {
                    frame: frame_index,
                    reason: format!("{:#}", e),
                })?;

            self.metrics.record_frame(
                subjects.len(),
                interactions.len(),
                started.elapsed().as_micros() as u64,
            );
            self.metrics.set_collapsed_ids(slots.collapsed_count() as u64);

            state.results.push(FrameResult {
                frame: frame_index,
                subjects,
                interactions,
            });
            state.processed += 1;
            state.progress = state
                .progress
                .max(progress_percent(state.processed, state.total));

            self.progress
                .publish(state.progress, &state.results)
                .map_err(|e| RunError::Publish {
                    frame: frame_index,
                    reason: format!("{:#}", e),
                })?;

            frame_index += 1;
        }

        info!(
            "Source exhausted after {} frame(s), {} slot(s) tracked",
            state.processed,
            analyzer.identity_count()
        );
        Ok(LoopEnd::Exhausted)
    }
}
