// src/video/frames_dir.rs
//
// Pure-Rust media backend: a "video" is a directory of numbered still
// frames (png/jpg/bmp, sorted by file name), and the annotated output is a
// directory of PNG frames. Container video goes through the OpenCV backend.

use super::annotate::Annotator;
use super::{
    frame_to_image, MediaBackend, SinkSpec, VideoProperties, VideoSink, VideoSource, Annotation,
};
use crate::errors::RunError;
use crate::types::Frame;
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct FrameDirBackend {
    output_dir: PathBuf,
    fps: f64,
    save_annotated: bool,
    annotator: Arc<Annotator>,
}

impl FrameDirBackend {
    pub fn new(output_dir: impl Into<PathBuf>, fps: f64, save_annotated: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            fps,
            save_annotated,
            annotator: Arc::new(Annotator::new(None)),
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Arc::new(annotator);
        self
    }
}

impl MediaBackend for FrameDirBackend {
    fn open_source(&self, input: &Path) -> Result<Box<dyn VideoSource>> {
        let source = FrameDirSource::open(input, self.fps).map_err(|e| RunError::SourceOpen {
            path: input.display().to_string(),
            reason: format!("{:#}", e),
        })?;
        Ok(Box::new(source))
    }

    fn create_sink(&self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>> {
        if !self.save_annotated {
            return Ok(Box::new(NullSink));
        }
        let dir = self.output_dir.join(format!("output_{}", spec.run_id));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        info!("Annotated frames: {}", dir.display());
        Ok(Box::new(FrameDirSink {
            dir,
            width: spec.width,
            height: spec.height,
            written: 0,
            annotator: Arc::clone(&self.annotator),
        }))
    }
}

pub struct FrameDirSource {
    pending: VecDeque<PathBuf>,
    properties: VideoProperties,
    read: u64,
}

impl FrameDirSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("{} is not a frame directory", dir.display());
        }

        let pending: VecDeque<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();

        let first = pending
            .front()
            .with_context(|| format!("No frames found in {}", dir.display()))?;
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("Failed to read {}", first.display()))?;

        let properties = VideoProperties {
            frame_count: pending.len() as u64,
            fps,
            width,
            height,
        };
        info!(
            "Frame directory {}: {}x{} @ {:.1} FPS, {} frames",
            dir.display(),
            width,
            height,
            fps,
            properties.frame_count
        );

        Ok(Self {
            pending,
            properties,
            read: 0,
        })
    }
}

impl VideoSource for FrameDirSource {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let path = match self.pending.pop_front() {
            Some(p) => p,
            None => return Ok(None),
        };
        let img = image::open(&path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?
            .to_rgb8();

        let timestamp_ms = self.read as f64 / self.properties.fps * 1000.0;
        self.read += 1;

        let (width, height) = img.dimensions();
        Ok(Some(Frame {
            data: img.into_raw(),
            width: width as usize,
            height: height as usize,
            timestamp_ms,
        }))
    }

    fn release(&mut self) -> Result<()> {
        debug!(
            "Releasing frame directory source ({} frame(s) unread)",
            self.pending.len()
        );
        self.pending.clear();
        Ok(())
    }
}

pub struct FrameDirSink {
    dir: PathBuf,
    width: u32,
    height: u32,
    written: u64,
    annotator: Arc<Annotator>,
}

impl VideoSink for FrameDirSink {
    fn write_frame(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()> {
        if frame.width as u32 != self.width || frame.height as u32 != self.height {
            anyhow::bail!(
                "Frame {}x{} does not match sink {}x{}",
                frame.width,
                frame.height,
                self.width,
                self.height
            );
        }
        let mut img = frame_to_image(frame)?;
        self.annotator.draw(&mut img, annotations);

        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        img.save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        info!("Wrote {} annotated frame(s) to {}", self.written, self.dir.display());
        Ok(())
    }

    fn output_ref(&self) -> Option<String> {
        Some(self.dir.display().to_string())
    }
}

/// Discards frames; used when annotated output is disabled.
pub struct NullSink;

impl VideoSink for NullSink {
    fn write_frame(&mut self, _frame: &Frame, _annotations: &[Annotation]) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        Ok(())
    }

    fn output_ref(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cattax-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_frames_in_name_order() {
        let dir = scratch_dir("frames-in");
        for (i, shade) in [(2, 200u8), (0, 0u8), (1, 100u8)] {
            let img = RgbImage::from_pixel(8, 6, image::Rgb([shade, shade, shade]));
            img.save(dir.join(format!("f{:03}.png", i))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut source = FrameDirSource::open(&dir, 25.0).unwrap();
        let props = source.properties();
        assert_eq!(props.frame_count, 3);
        assert_eq!((props.width, props.height), (8, 6));

        let shades: Vec<u8> = std::iter::from_fn(|| source.read_frame().unwrap())
            .map(|f| f.data[0])
            .collect();
        assert_eq!(shades, vec![0, 100, 200]);
        source.release().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory_is_open_error() {
        let backend = FrameDirBackend::new(std::env::temp_dir(), 30.0, false);
        let err = backend
            .open_source(Path::new("/definitely/not/here"))
            .err()
            .unwrap();
        assert!(err.downcast_ref::<RunError>().is_some());
    }

    #[test]
    fn test_sink_writes_numbered_pngs() {
        let out = scratch_dir("frames-out");
        let backend = FrameDirBackend::new(&out, 30.0, true);
        let spec = SinkSpec {
            run_id: "42".to_string(),
            width: 4,
            height: 4,
            fps: 30.0,
        };
        let mut sink = backend.create_sink(&spec).unwrap();
        let frame = Frame {
            data: vec![0; 4 * 4 * 3],
            width: 4,
            height: 4,
            timestamp_ms: 0.0,
        };
        sink.write_frame(&frame, &[]).unwrap();
        sink.write_frame(&frame, &[]).unwrap();
        sink.release().unwrap();

        let dir = out.join("output_42");
        assert!(dir.join("frame_000000.png").exists());
        assert!(dir.join("frame_000001.png").exists());
        assert_eq!(sink.output_ref(), Some(dir.display().to_string()));
        let _ = std::fs::remove_dir_all(&out);
    }
}
