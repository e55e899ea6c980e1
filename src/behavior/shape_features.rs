// src/behavior/shape_features.rs
//
// Fixed geometric descriptors for one region contour.
//
// Degenerate inputs never fail here: ratios fall back to neutral values
// (1 for solidity/shape ratio, 0 for compactness) because single-frame
// segmentation noise is expected. The only rejection is a contour with
// fewer than 3 points, which is not a region at all.

use crate::errors::ExtractionError;
use crate::geometry::{self, bounding_box, contour_area, hull_area, perimeter};
use imageproc::point::Point;
use serde::Serialize;
use std::f64::consts::PI;

/// Below this many points neither a hull nor an ellipse fit is meaningful.
const MIN_POINTS_FOR_FIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeFeatures {
    /// width / height of the axis-aligned bounding box
    pub aspect_ratio: f64,
    pub area: f64,
    pub perimeter: f64,
    /// 4πA / P², 1.0 for a perfect disc
    pub compactness: f64,
    /// area / convex hull area
    pub solidity: f64,
    /// minor / major axis of the fitted ellipse
    pub shape_ratio: f64,
}

impl ShapeFeatures {
    pub fn extract(contour: &[Point<i32>]) -> Result<Self, ExtractionError> {
        if contour.len() < 3 {
            return Err(ExtractionError::TooFewPoints(contour.len()));
        }

        let bbox = bounding_box(contour).ok_or(ExtractionError::TooFewPoints(0))?;
        let aspect_ratio = bbox.width as f64 / bbox.height as f64;

        let area = contour_area(contour);
        let perimeter = perimeter(contour);
        let compactness = if perimeter > 0.0 {
            4.0 * PI * area / (perimeter * perimeter)
        } else {
            0.0
        };

        let (solidity, shape_ratio) = if contour.len() >= MIN_POINTS_FOR_FIT {
            let hull = hull_area(contour);
            let solidity = if hull > 0.0 { area / hull } else { 1.0 };
            let shape_ratio = geometry::fit_ellipse(contour)
                .and_then(|axes| axes.ratio())
                .unwrap_or(1.0);
            (solidity, shape_ratio)
        } else {
            (1.0, 1.0)
        };

        let features = Self {
            aspect_ratio,
            area,
            perimeter,
            compactness,
            solidity,
            shape_ratio,
        };
        features.check_finite()?;
        Ok(features)
    }

    fn check_finite(&self) -> Result<(), ExtractionError> {
        let fields = [
            ("aspect_ratio", self.aspect_ratio),
            ("area", self.area),
            ("perimeter", self.perimeter),
            ("compactness", self.compactness),
            ("solidity", self.solidity),
            ("shape_ratio", self.shape_ratio),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, _)) => Err(ExtractionError::NonFinite(name)),
            None => Ok(()),
        }
    }
}
