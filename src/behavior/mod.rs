// src/behavior/mod.rs
//
// Per-identity behavior engine.
//
// Signal flow (per identity, per frame):
//   RegionMask → external contour → centroid
//     contour  → shape_features ─┐
//     centroid → motion ─────────┼→ classifier → smoother → BehaviorLabel
//
// Orchestrated per run by analyzer::BehaviorAnalyzer.

pub mod analyzer;
pub mod classifier;
pub mod motion;
pub mod proximity;
pub mod shape_features;
pub mod smoother;

pub use analyzer::{BehaviorAnalyzer, IdentityObservation, TrackedIdentity};
pub use classifier::{BehaviorClassifier, BehaviorLabel};
pub use motion::{MotionEstimator, MotionSample};
pub use proximity::{interacting_pairs, Interaction};
pub use shape_features::ShapeFeatures;
pub use smoother::BehaviorSmoother;
