// src/pipeline/sinks.rs
//
// File-backed progress sinks.
//
//   JsonlProgressSink: append-only event log, one line per frame plus one
//                      terminal line, flushed per event. Each frame line
//                      carries only the newly appended result.
//   JobRecordSink:     overwrites a single JSON job record
//                      {id, status, progress, results, processed_video}.

use super::progress::{FrameResult, ProgressSink, RunStatus, TerminalReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum JsonlEvent<'a> {
    Progress {
        run_id: &'a str,
        progress: f64,
        frames_processed: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<&'a FrameResult>,
    },
    Terminal(&'a TerminalReport),
}

pub struct JsonlProgressSink<W: Write + Send> {
    run_id: String,
    writer: W,
}

impl JsonlProgressSink<BufWriter<File>> {
    pub fn create(run_id: &str, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create progress log {}", path.display()))?;
        Ok(Self::new(run_id, BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonlProgressSink<W> {
    pub fn new(run_id: &str, writer: W) -> Self {
        Self {
            run_id: run_id.to_string(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn write_event<W: Write>(writer: &mut W, event: &JsonlEvent) -> Result<()> {
    serde_json::to_writer(&mut *writer, event)?;
    writer.write_all(b"\n")?;
    Ok(())
}

impl<W: Write + Send> ProgressSink for JsonlProgressSink<W> {
    fn publish(&mut self, progress: f64, results: &[FrameResult]) -> Result<()> {
        let event = JsonlEvent::Progress {
            run_id: &self.run_id,
            progress,
            frames_processed: results.len(),
            result: results.last(),
        };
        write_event(&mut self.writer, &event)?;
        self.writer.flush()?;
        Ok(())
    }

    fn publish_terminal(&mut self, report: &TerminalReport) -> Result<()> {
        write_event(&mut self.writer, &JsonlEvent::Terminal(report))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JobResults<'a> {
    Frames { frames: &'a [FrameResult] },
    Error { error: &'a str },
}

#[derive(Debug, Serialize)]
struct JobRecord<'a> {
    id: &'a str,
    status: RunStatus,
    progress: f64,
    results: JobResults<'a>,
    processed_video: Option<&'a str>,
}

pub struct JobRecordSink {
    run_id: String,
    path: PathBuf,
}

impl JobRecordSink {
    pub fn new(run_id: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.to_string(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Write-then-rename so readers never see a half-written record.
    fn store(&self, record: &JobRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, body)
            .with_context(|| format!("Failed to write job record {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace job record {}", self.path.display()))?;
        Ok(())
    }
}

impl ProgressSink for JobRecordSink {
    fn publish(&mut self, progress: f64, results: &[FrameResult]) -> Result<()> {
        self.store(&JobRecord {
            id: &self.run_id,
            status: RunStatus::Processing,
            progress,
            results: JobResults::Frames { frames: results },
            processed_video: None,
        })
    }

    fn publish_terminal(&mut self, report: &TerminalReport) -> Result<()> {
        let results = match (&report.status, &report.error) {
            (RunStatus::Failed, Some(error)) => JobResults::Error { error },
            _ => JobResults::Frames {
                frames: &report.frames,
            },
        };
        self.store(&JobRecord {
            id: &self.run_id,
            status: report.status,
            progress: report.progress,
            results,
            processed_video: report.output.as_deref(),
        })?;
        debug!(
            "Job record {} is {}",
            self.path.display(),
            report.status.as_str()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorLabel;
    use crate::pipeline::progress::SubjectBehavior;
    use crate::types::Centroid;
    use chrono::Utc;

    fn frame(index: u64) -> FrameResult {
        FrameResult {
            frame: index,
            subjects: vec![SubjectBehavior {
                slot_id: 1,
                behavior: BehaviorLabel::Resting,
                position: Some(Centroid::new(10, 20)),
            }],
            interactions: Vec::new(),
        }
    }

    fn report(status: RunStatus, frames: Vec<FrameResult>, error: Option<&str>) -> TerminalReport {
        TerminalReport {
            run_id: "7".to_string(),
            status,
            progress: if status == RunStatus::Completed { 100.0 } else { 50.0 },
            total_frames: 2,
            processed_frames: frames.len() as u64,
            frames,
            error: error.map(str::to_string),
            output: if status == RunStatus::Completed {
                Some("media/processed/output_7.mp4".to_string())
            } else {
                None
            },
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_jsonl_writes_one_line_per_event() {
        let mut sink = JsonlProgressSink::new("7", Vec::new());
        let results = vec![frame(0), frame(1)];
        sink.publish(50.0, &results[..1]).unwrap();
        sink.publish(100.0, &results).unwrap();
        sink.publish_terminal(&report(RunStatus::Completed, results, None))
            .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "progress");
        assert_eq!(lines[0]["frames_processed"], 1);
        assert_eq!(lines[1]["result"]["frame"], 1);
        assert_eq!(lines[2]["event"], "terminal");
        assert_eq!(lines[2]["status"], "completed");
        assert_eq!(lines[2]["frames"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_jsonl_file_sees_every_frame_as_published() {
        let path = scratch_file("jsonl-live").with_file_name("run.progress.jsonl");
        let mut sink = JsonlProgressSink::create("7", &path).unwrap();
        let results = vec![frame(0), frame(1), frame(2)];

        for n in 1..=results.len() {
            sink.publish(n as f64 / 3.0 * 100.0, &results[..n]).unwrap();
            let on_disk = std::fs::read_to_string(&path).unwrap();
            assert_eq!(on_disk.lines().count(), n);
        }
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cattax-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("job.json")
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn test_job_record_tracks_progress_then_completion() {
        let path = scratch_file("job-ok");
        let mut sink = JobRecordSink::new("7", &path);
        let results = vec![frame(0)];

        sink.publish(50.0, &results).unwrap();
        let record = read_json(&path);
        assert_eq!(record["status"], "processing");
        assert_eq!(record["results"]["frames"].as_array().unwrap().len(), 1);
        assert!(record["processed_video"].is_null());

        sink.publish_terminal(&report(RunStatus::Completed, vec![frame(0), frame(1)], None))
            .unwrap();
        let record = read_json(&path);
        assert_eq!(record["id"], "7");
        assert_eq!(record["status"], "completed");
        assert_eq!(record["progress"], 100.0);
        assert_eq!(record["processed_video"], "media/processed/output_7.mp4");
        assert_eq!(record["results"]["frames"].as_array().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_job_record_failure_carries_error_message() {
        let path = scratch_file("job-failed");
        let mut sink = JobRecordSink::new("7", &path);
        sink.publish_terminal(&report(
            RunStatus::Failed,
            Vec::new(),
            Some("could not open video source x.mp4: no such file"),
        ))
        .unwrap();

        let record = read_json(&path);
        assert_eq!(record["status"], "failed");
        assert_eq!(
            record["results"]["error"],
            "could not open video source x.mp4: no such file"
        );
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
