// src/main.rs

use anyhow::{Context, Result};
use cattax::detection::ReplayTracker;
use cattax::pipeline::{
    BehaviorRun, CancellationToken, JobRecordSink, JsonlProgressSink, ProgressSink, RunStatus,
};
use cattax::types::Config;
use cattax::video::{annotate::Annotator, find_inputs, FrameDirBackend, MediaBackend};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cattax", version, about = "Per-cat behavior analysis over tracked video")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Detections to replay: a JSONL file, or a directory of `<run id>.jsonl`.
    /// Defaults to `detection.detections_path`, then to `<input>.jsonl`.
    #[arg(short, long)]
    detections: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ProgressFormat::Jsonl)]
    progress: ProgressFormat,

    /// Videos or frame directories; defaults to everything in `video.input_dir`
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProgressFormat {
    /// `<output_dir>/<run id>.progress.jsonl`, one line per frame
    Jsonl,
    /// `<output_dir>/<run id>.job.json`, overwritten snapshot
    Job,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🐈 Behavior analysis starting");
    info!(
        "Slots={}, window={}, change threshold={}, movement threshold={:.1}px",
        config.analysis.max_slots,
        config.analysis.history_window,
        config.analysis.state_change_threshold,
        config.analysis.movement_threshold
    );

    let inputs = if args.inputs.is_empty() {
        find_inputs(&config.video.input_dir)?
    } else {
        args.inputs.clone()
    };
    if inputs.is_empty() {
        error!("No inputs found in {}", config.video.input_dir);
        return Ok(());
    }

    let backends = Backends::new(&config)?;
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling all runs");
                cancel.cancel();
            }
        });
    }

    let detections = args
        .detections
        .clone()
        .or_else(|| config.detection.detections_path.as_ref().map(PathBuf::from));

    let mut handles = Vec::with_capacity(inputs.len());
    let mut failed = 0usize;
    for input in &inputs {
        let run = match prepare_run(
            input,
            &config,
            &backends,
            detections.as_deref(),
            args.progress,
        ) {
            Ok(run) => run.with_cancellation(cancel.clone()),
            Err(e) => {
                error!("Skipping {}: {:#}", input.display(), e);
                failed += 1;
                continue;
            }
        };
        let run_id = run.run_id().to_string();
        handles.push((run_id, tokio::task::spawn_blocking(move || run.execute())));
    }

    for (run_id, handle) in handles {
        match handle.await {
            Ok(Ok(summary)) => {
                info!(
                    "✓ {}: {} after {}/{} frame(s)",
                    run_id,
                    summary.status.as_str(),
                    summary.processed_frames,
                    summary.total_frames
                );
                if let Some(output) = &summary.output {
                    info!("  Annotated output: {}", output);
                }
                if summary.status == RunStatus::Cancelled {
                    failed += 1;
                }
            }
            Ok(Err(e)) => {
                error!("✗ {}: {:#}", run_id, e);
                failed += 1;
            }
            Err(e) => {
                error!("✗ {}: run task aborted: {}", run_id, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} run(s) did not complete", failed, inputs.len());
    }
    info!("All {} run(s) completed", inputs.len());
    Ok(())
}

/// Media backends shared by all runs. Frame directories always work;
/// container files need the `opencv` feature.
struct Backends {
    frames: Arc<dyn MediaBackend>,
    #[cfg(feature = "opencv")]
    video: Arc<dyn MediaBackend>,
}

impl Backends {
    fn new(config: &Config) -> Result<Self> {
        let v = &config.video;
        let annotator = match &v.font_path {
            Some(path) => Annotator::with_font_file(Path::new(path))?,
            None => Annotator::new(None),
        };
        let frames = FrameDirBackend::new(&v.output_dir, v.fallback_fps, v.save_annotated)
            .with_annotator(annotator);

        Ok(Self {
            frames: Arc::new(frames),
            #[cfg(feature = "opencv")]
            video: Arc::new(cattax::video::opencv_backend::OpenCvBackend::new(
                &v.output_dir,
                v.fallback_fps,
                v.save_annotated,
            )),
        })
    }

    fn for_input(&self, input: &Path) -> Result<Arc<dyn MediaBackend>> {
        if input.is_dir() {
            return Ok(Arc::clone(&self.frames));
        }
        #[cfg(feature = "opencv")]
        {
            Ok(Arc::clone(&self.video))
        }
        #[cfg(not(feature = "opencv"))]
        {
            anyhow::bail!(
                "{} is a video file; build with `--features opencv` or pass a frame directory",
                input.display()
            )
        }
    }
}

fn run_id_for(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("run")
        .to_string()
}

fn detections_for(input: &Path, run_id: &str, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(p) if p.is_dir() => p.join(format!("{}.jsonl", run_id)),
        Some(p) => p.to_path_buf(),
        None => input.with_extension("jsonl"),
    }
}

fn prepare_run(
    input: &Path,
    config: &Config,
    backends: &Backends,
    detections: Option<&Path>,
    format: ProgressFormat,
) -> Result<BehaviorRun> {
    let run_id = run_id_for(input);
    let backend = backends.for_input(input)?;

    let replay_path = detections_for(input, &run_id, detections);
    let tracker = ReplayTracker::from_path(&replay_path)
        .with_context(|| format!("No detections for run {}", run_id))?;
    info!(
        "Run {}: {} with {} replayed frame(s) from {}",
        run_id,
        input.display(),
        tracker.frame_count(),
        replay_path.display()
    );

    let out = Path::new(&config.video.output_dir);
    let progress: Box<dyn ProgressSink> = match format {
        ProgressFormat::Jsonl => Box::new(JsonlProgressSink::create(
            &run_id,
            &out.join(format!("{}.progress.jsonl", run_id)),
        )?),
        ProgressFormat::Job => Box::new(JobRecordSink::new(
            &run_id,
            out.join(format!("{}.job.json", run_id)),
        )),
    };

    Ok(BehaviorRun::new(
        run_id,
        input,
        config.clone(),
        backend,
        Box::new(tracker),
        progress,
    ))
}
