// src/video/mod.rs
//
// Frame I/O seams. Decoding and encoding are collaborators of the
// orchestrator: it only needs sequential reads with up-front properties,
// and an ordered per-frame write of the annotated working-resolution frame.

pub mod annotate;
pub mod frames_dir;
#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use frames_dir::{FrameDirBackend, NullSink};

use crate::behavior::BehaviorLabel;
use crate::geometry::Contour;
use crate::types::{Centroid, Frame};
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    /// Declared frame count; may disagree with what the container yields
    pub frame_count: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

pub trait VideoSource: Send {
    fn properties(&self) -> VideoProperties;
    fn read_frame(&mut self) -> Result<Option<Frame>>;
    fn release(&mut self) -> Result<()>;
}

/// Geometry and rate the sink must be created with.
#[derive(Debug, Clone)]
pub struct SinkSpec {
    pub run_id: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Per-identity overlay drawn by the sink.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub slot_id: u32,
    pub label: BehaviorLabel,
    pub outline: Option<Contour>,
    pub anchor: Option<Centroid>,
    pub color: [u8; 3],
}

impl Annotation {
    pub fn text(&self) -> String {
        format!("Cat {}: {}", self.slot_id, self.label)
    }
}

pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()>;
    fn release(&mut self) -> Result<()>;
    /// Where the annotated output ended up, if anywhere.
    fn output_ref(&self) -> Option<String>;
}

pub trait MediaBackend: Send + Sync {
    fn open_source(&self, input: &Path) -> Result<Box<dyn VideoSource>>;
    fn create_sink(&self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>>;
}

/// RGB slot colors: slot 1 green, slot 2 blue, then cycling.
pub fn slot_color(slot_id: u32) -> [u8; 3] {
    const PALETTE: [[u8; 3]; 4] = [[0, 255, 0], [0, 0, 255], [255, 165, 0], [255, 0, 255]];
    PALETTE[(slot_id.saturating_sub(1) as usize) % PALETTE.len()]
}

/// Downscaled dimensions, never below 1 px per side.
pub fn working_size(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let w = ((width as f64 * factor) as u32).max(1);
    let h = ((height as f64 * factor) as u32).max(1);
    (w, h)
}

pub fn frame_to_image(frame: &Frame) -> Result<RgbImage> {
    RgbImage::from_raw(frame.width as u32, frame.height as u32, frame.data.clone()).with_context(
        || {
            format!(
                "Frame buffer of {} bytes does not match {}x{} RGB",
                frame.data.len(),
                frame.width,
                frame.height
            )
        },
    )
}

pub fn resize_frame(frame: &Frame, width: u32, height: u32) -> Result<Frame> {
    if frame.width as u32 == width && frame.height as u32 == height {
        return Ok(frame.clone());
    }
    let img = frame_to_image(frame)?;
    let resized = imageops::resize(&img, width, height, FilterType::Triangle);
    Ok(Frame {
        data: resized.into_raw(),
        width: width as usize,
        height: height as usize,
        timestamp_ms: frame.timestamp_ms,
    })
}

/// Video files (or frame directories) to process under `input_dir`.
pub fn find_inputs(input_dir: &str) -> Result<Vec<PathBuf>> {
    let root = Path::new(input_dir);
    if !root.exists() {
        anyhow::bail!("Input directory {} does not exist", input_dir);
    }

    let mut inputs = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_dir() {
            inputs.push(path.to_path_buf());
            continue;
        }
        let is_video = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video {
            inputs.push(path.to_path_buf());
        }
    }

    info!("Found {} input(s) in {}", inputs.len(), input_dir);
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: usize, height: usize, rgb: [u8; 3]) -> Frame {
        Frame {
            data: rgb.iter().copied().cycle().take(width * height * 3).collect(),
            width,
            height,
            timestamp_ms: 40.0,
        }
    }

    #[test]
    fn test_working_size_halves_and_truncates() {
        assert_eq!(working_size(1920, 1080, 0.5), (960, 540));
        assert_eq!(working_size(641, 481, 0.5), (320, 240));
        assert_eq!(working_size(1, 1, 0.5), (1, 1));
    }

    #[test]
    fn test_resize_frame_dimensions_and_timestamp() {
        let frame = solid_frame(64, 48, [10, 20, 30]);
        let small = resize_frame(&frame, 32, 24).unwrap();
        assert_eq!((small.width, small.height), (32, 24));
        assert_eq!(small.data.len(), 32 * 24 * 3);
        assert_eq!(&small.data[0..3], &[10, 20, 30]);
        assert_eq!(small.timestamp_ms, 40.0);
    }

    #[test]
    fn test_frame_buffer_size_mismatch_is_error() {
        let mut frame = solid_frame(8, 8, [0, 0, 0]);
        frame.data.truncate(10);
        assert!(resize_frame(&frame, 4, 4).is_err());
    }

    #[test]
    fn test_slot_colors() {
        assert_eq!(slot_color(1), [0, 255, 0]);
        assert_eq!(slot_color(2), [0, 0, 255]);
        assert_eq!(slot_color(5), slot_color(1));
    }
}
