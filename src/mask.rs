// src/mask.rs
//
// Region mask → single external contour.
//
// Polygon masks are rasterised at the working resolution first, so polygon
// and raster masks go through the same border tracing and both yield
// integer pixel boundaries. Only outermost borders are considered; when a
// mask splits into several blobs the largest one by area wins.

use crate::errors::ExtractionError;
use crate::geometry::{contour_area, Contour};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Segmentation output for one tracked region, in working-resolution pixels.
#[derive(Debug, Clone)]
pub enum RegionMask {
    Polygon(Vec<(f32, f32)>),
    Raster(GrayImage),
}

impl RegionMask {
    pub fn polygon<I: IntoIterator<Item = (f32, f32)>>(points: I) -> Self {
        RegionMask::Polygon(points.into_iter().collect())
    }
}

/// Serializable polygon form, as carried in replay files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonMask(pub Vec<[f32; 2]>);

impl From<PolygonMask> for RegionMask {
    fn from(p: PolygonMask) -> Self {
        RegionMask::Polygon(p.0.into_iter().map(|[x, y]| (x, y)).collect())
    }
}

pub fn external_contour(
    mask: &RegionMask,
    width: u32,
    height: u32,
) -> Result<Contour, ExtractionError> {
    match mask {
        RegionMask::Polygon(points) => {
            let raster = rasterize_polygon(points, width, height)?;
            largest_external(&raster)
        }
        RegionMask::Raster(raster) => largest_external(raster),
    }
}

fn rasterize_polygon(
    points: &[(f32, f32)],
    width: u32,
    height: u32,
) -> Result<GrayImage, ExtractionError> {
    // Truncate like an int32 cast, then drop repeats (including the closing point)
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            return Err(ExtractionError::NonFinite("mask vertex"));
        }
        let p = Point::new(x as i32, y as i32);
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() < 3 {
        return Err(ExtractionError::TooFewPoints(poly.len()));
    }

    let mut raster = GrayImage::new(width.max(1), height.max(1));
    draw_polygon_mut(&mut raster, &poly, Luma([255u8]));
    Ok(raster)
}

fn largest_external(raster: &GrayImage) -> Result<Contour, ExtractionError> {
    find_contours::<i32>(raster)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| c.points)
        .max_by(|a, b| {
            contour_area(a)
                .partial_cmp(&contour_area(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(ExtractionError::NoContour)
}
