// src/lib.rs
//
// Per-subject behavior classification over tracked video.
//
// Each input video is one run: frames are read in order, an external
// instance-segmentation tracker supplies per-subject masks, and every
// subject gets a smoothed behavior label (walking / resting / standing)
// per frame. Progress and the final result go to a pluggable sink.

pub mod behavior;
pub mod config;
pub mod detection;
pub mod errors;
pub mod geometry;
pub mod mask;
pub mod pipeline;
pub mod types;
pub mod video;
