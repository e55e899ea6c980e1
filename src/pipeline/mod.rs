// src/pipeline/mod.rs

pub mod cancel;
pub mod metrics;
pub mod orchestrator;
pub mod progress;
pub mod resources;
pub mod sinks;

pub use cancel::CancellationToken;
pub use metrics::{MetricsSummary, RunMetrics};
pub use orchestrator::{BehaviorRun, RunSummary};
pub use progress::{
    progress_percent, FrameResult, ProgressSink, RunStatus, SubjectBehavior, TerminalReport,
};
pub use sinks::{JobRecordSink, JsonlProgressSink};
