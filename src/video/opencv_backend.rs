// src/video/opencv_backend.rs
//
// Container video through OpenCV: VideoCapture in, mp4v VideoWriter out.
// Frames cross the boundary as RGB8 so the rest of the crate never sees BGR.

use super::{Annotation, MediaBackend, SinkSpec, VideoProperties, VideoSink, VideoSource};
use crate::errors::RunError;
use crate::types::Frame;
use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct OpenCvBackend {
    output_dir: PathBuf,
    fallback_fps: f64,
    save_annotated: bool,
}

impl OpenCvBackend {
    pub fn new(output_dir: impl Into<PathBuf>, fallback_fps: f64, save_annotated: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            fallback_fps,
            save_annotated,
        }
    }
}

impl MediaBackend for OpenCvBackend {
    fn open_source(&self, input: &Path) -> Result<Box<dyn VideoSource>> {
        let reader = open_capture(input, self.fallback_fps).map_err(|e| RunError::SourceOpen {
            path: input.display().to_string(),
            reason: format!("{:#}", e),
        })?;
        Ok(Box::new(reader))
    }

    fn create_sink(&self, spec: &SinkSpec) -> Result<Box<dyn VideoSink>> {
        if !self.save_annotated {
            return Ok(Box::new(super::NullSink));
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(format!("output_{}.mp4", spec.run_id));
        let path_str = output_path
            .to_str()
            .context("Output path is not valid UTF-8")?
            .to_string();
        info!("Output video: {}", output_path.display());

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &path_str,
            fourcc,
            spec.fps,
            core::Size::new(spec.width as i32, spec.height as i32),
            true,
        )?;

        Ok(Box::new(OpenCvSink {
            writer,
            path: path_str,
            written: 0,
        }))
    }
}

fn open_capture(path: &Path, fallback_fps: f64) -> Result<OpenCvSource> {
    info!("Opening video: {}", path.display());
    let path_str = path.to_str().context("Input path is not valid UTF-8")?;

    let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        anyhow::bail!("Failed to open video file");
    }

    let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
    let fps = if fps > 0.0 { fps } else { fallback_fps };
    let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)?.max(0.0);
    let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)?;
    let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)?;

    info!(
        "Video properties: {}x{} @ {:.1} FPS, {} frames",
        width, height, fps, total_frames
    );

    Ok(OpenCvSource {
        cap,
        properties: VideoProperties {
            frame_count: total_frames as u64,
            fps,
            width: width as u32,
            height: height as u32,
        },
        current_frame: 0,
    })
}

pub struct OpenCvSource {
    cap: VideoCapture,
    properties: VideoProperties,
    current_frame: u64,
}

// VideoCapture is only ever touched from the owning run's thread
unsafe impl Send for OpenCvSource {}

impl VideoSource for OpenCvSource {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        let timestamp_ms = self.current_frame as f64 / self.properties.fps * 1000.0;
        self.current_frame += 1;

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;
        let data = rgb_mat.data_bytes()?.to_vec();

        Ok(Some(Frame {
            data,
            width: rgb_mat.cols() as usize,
            height: rgb_mat.rows() as usize,
            timestamp_ms,
        }))
    }

    fn release(&mut self) -> Result<()> {
        debug!("Releasing capture after {} frame(s)", self.current_frame);
        VideoCaptureTrait::release(&mut self.cap)?;
        Ok(())
    }
}

pub struct OpenCvSink {
    writer: VideoWriter,
    path: String,
    written: u64,
}

unsafe impl Send for OpenCvSink {}

impl VideoSink for OpenCvSink {
    fn write_frame(&mut self, frame: &Frame, annotations: &[Annotation]) -> Result<()> {
        let mat = Mat::from_slice(&frame.data)?;
        let mat = mat.reshape(3, frame.height as i32)?;

        let mut output = Mat::default();
        imgproc::cvt_color(&mat, &mut output, imgproc::COLOR_RGB2BGR, 0)?;

        for a in annotations {
            let [r, g, b] = a.color;
            let color = core::Scalar::new(b as f64, g as f64, r as f64, 0.0);

            if let Some(outline) = &a.outline {
                let n = outline.len();
                for i in 0..n {
                    let p = outline[i];
                    let q = outline[(i + 1) % n];
                    imgproc::line(
                        &mut output,
                        core::Point::new(p.x, p.y),
                        core::Point::new(q.x, q.y),
                        color,
                        2,
                        imgproc::LINE_8,
                        0,
                    )?;
                }
            }

            if let Some(anchor) = a.anchor {
                imgproc::put_text(
                    &mut output,
                    &a.text(),
                    core::Point::new(anchor.x, anchor.y - 10),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    0.7,
                    color,
                    2,
                    imgproc::LINE_8,
                    false,
                )?;
            }
        }

        opencv::videoio::VideoWriterTrait::write(&mut self.writer, &output)?;
        self.written += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        info!("Closing {} after {} frame(s)", self.path, self.written);
        opencv::videoio::VideoWriterTrait::release(&mut self.writer)?;
        Ok(())
    }

    fn output_ref(&self) -> Option<String> {
        Some(self.path.clone())
    }
}
