// src/geometry.rs
//
// Contour geometry on integer pixel boundaries: moments, area, perimeter,
// convex hull, bounding box and least-squares ellipse fit.
//
// Conventions follow the usual image-processing definitions:
//   - bounding box extents are inclusive (a single pixel is 1x1)
//   - area is the absolute shoelace area of the closed polygon
//   - moments are polygon (Green's theorem) moments, not pixel sums

use imageproc::geometry::{arc_length, convex_hull};
use imageproc::point::Point;
use nalgebra::{DMatrix, DVector};

pub type Contour = Vec<Point<i32>>;

const ELLIPSE_EPS: f64 = 1e-8;
const SVD_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

/// Axes (full lengths) of a fitted ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseAxes {
    pub width: f64,
    pub height: f64,
    pub angle_rad: f64,
}

impl EllipseAxes {
    /// Minor/major ratio in (0, 1], or None when the fit collapsed.
    pub fn ratio(&self) -> Option<f64> {
        let major = self.width.max(self.height);
        let minor = self.width.min(self.height);
        if major <= ELLIPSE_EPS || !major.is_finite() || !minor.is_finite() {
            return None;
        }
        Some(minor / major)
    }
}

pub fn bounding_box(contour: &[Point<i32>]) -> Option<BoundingBox> {
    let first = contour.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in contour.iter().skip(1) {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Polygon moments up to first order. Sign is normalised so `m00 >= 0`
/// regardless of winding direction.
pub fn moments(contour: &[Point<i32>]) -> Moments {
    let n = contour.len();
    if n < 3 {
        return Moments {
            m00: 0.0,
            m10: 0.0,
            m01: 0.0,
        };
    }

    let (mut a00, mut a10, mut a01) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let p = contour[i];
        let q = contour[(i + 1) % n];
        let (xi, yi) = (p.x as f64, p.y as f64);
        let (xj, yj) = (q.x as f64, q.y as f64);
        let cross = xi * yj - xj * yi;
        a00 += cross;
        a10 += cross * (xi + xj);
        a01 += cross * (yi + yj);
    }

    let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * a00 / 2.0,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
    }
}

impl Moments {
    /// Centroid, truncated toward zero. None for zero-area contours.
    pub fn centroid(&self) -> Option<(i32, i32)> {
        if self.m00 == 0.0 {
            return None;
        }
        let cx = self.m10 / self.m00;
        let cy = self.m01 / self.m00;
        if !cx.is_finite() || !cy.is_finite() {
            return None;
        }
        Some((cx as i32, cy as i32))
    }
}

pub fn contour_area(contour: &[Point<i32>]) -> f64 {
    moments(contour).m00
}

pub fn perimeter(contour: &[Point<i32>]) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }
    arc_length(contour, true)
}

pub fn hull_area(contour: &[Point<i32>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let hull = convex_hull(contour);
    contour_area(&hull)
}

/// Algebraic least-squares ellipse fit.
///
/// Points are centred and scaled for conditioning, the general conic is
/// solved first, then the centre is recovered and the quadratic terms are
/// re-fitted around it. Needs at least 5 points.
pub fn fit_ellipse(contour: &[Point<i32>]) -> Option<EllipseAxes> {
    let n = contour.len();
    if n < 5 {
        return None;
    }

    let cx = contour.iter().map(|p| p.x as f64).sum::<f64>() / n as f64;
    let cy = contour.iter().map(|p| p.y as f64).sum::<f64>() / n as f64;
    let spread: f64 = contour
        .iter()
        .map(|p| (p.x as f64 - cx).abs() + (p.y as f64 - cy).abs())
        .sum();
    let scale = 100.0 / spread.max(f32::EPSILON as f64);

    let pts: Vec<(f64, f64)> = contour
        .iter()
        .map(|p| ((p.x as f64 - cx) * scale, (p.y as f64 - cy) * scale))
        .collect();

    // -A x^2 - B y^2 - C xy + D x + E y = 10000
    let mut rows = Vec::with_capacity(n * 5);
    for &(x, y) in &pts {
        rows.extend_from_slice(&[-x * x, -y * y, -x * y, x, y]);
    }
    let a = DMatrix::from_row_slice(n, 5, &rows);
    let b = DVector::from_element(n, 10000.0);
    let gfp = a.svd(true, true).solve(&b, SVD_EPS).ok()?;

    // Centre: gradient of the conic vanishes
    let a2 = DMatrix::from_row_slice(2, 2, &[2.0 * gfp[0], gfp[2], gfp[2], 2.0 * gfp[1]]);
    let b2 = DVector::from_row_slice(&[gfp[3], gfp[4]]);
    let centre = a2.svd(true, true).solve(&b2, SVD_EPS).ok()?;
    let (x0, y0) = (centre[0], centre[1]);

    // Re-fit A, B, C around that centre
    let mut rows = Vec::with_capacity(n * 3);
    for &(x, y) in &pts {
        let (dx, dy) = (x - x0, y - y0);
        rows.extend_from_slice(&[dx * dx, dy * dy, dx * dy]);
    }
    let a3 = DMatrix::from_row_slice(n, 3, &rows);
    let b3 = DVector::from_element(n, 1.0);
    let q = a3.svd(true, true).solve(&b3, SVD_EPS).ok()?;

    let angle = -0.5 * q[2].atan2(q[1] - q[0]);
    let t = if q[2].abs() > ELLIPSE_EPS {
        q[2] / (-2.0 * angle).sin()
    } else {
        q[1] - q[0]
    };

    let mut r1 = (q[0] + q[1] - t).abs();
    if r1 > ELLIPSE_EPS {
        r1 = (2.0 / r1).sqrt();
    }
    let mut r2 = (q[0] + q[1] + t).abs();
    if r2 > ELLIPSE_EPS {
        r2 = (2.0 / r2).sqrt();
    }

    let axes = EllipseAxes {
        width: r1 * 2.0 / scale,
        height: r2 * 2.0 / scale,
        angle_rad: angle,
    };
    if axes.width.is_finite() && axes.height.is_finite() {
        Some(axes)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Contour {
        vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ]
    }

    fn ellipse_points(cx: f64, cy: f64, a: f64, b: f64, n: usize) -> Contour {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                Point::new(
                    (cx + a * t.cos()).round() as i32,
                    (cy + b * t.sin()).round() as i32,
                )
            })
            .collect()
    }

    #[test]
    fn test_rectangle_area_and_perimeter() {
        let r = rect(10, 20, 40, 10);
        assert_abs_diff_eq!(contour_area(&r), 400.0);
        assert_abs_diff_eq!(perimeter(&r), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_area_independent_of_winding() {
        let mut r = rect(0, 0, 8, 6);
        let forward = contour_area(&r);
        r.reverse();
        assert_abs_diff_eq!(contour_area(&r), forward);
        assert!(forward > 0.0);
    }

    #[test]
    fn test_bounding_box_is_inclusive() {
        let bb = bounding_box(&rect(10, 20, 40, 10)).unwrap();
        assert_eq!(bb, BoundingBox { x: 10, y: 20, width: 41, height: 11 });
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn test_centroid_of_rectangle() {
        let m = moments(&rect(10, 20, 40, 10));
        assert_eq!(m.centroid(), Some((30, 25)));
    }

    #[test]
    fn test_centroid_of_degenerate_line_is_none() {
        let line = vec![Point::new(0, 0), Point::new(5, 0), Point::new(10, 0)];
        assert_eq!(moments(&line).centroid(), None);
    }

    #[test]
    fn test_hull_area_of_concave_shape() {
        // L-shape: 10x10 square with a 5x5 bite out of one corner
        let l_shape = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(5, 5),
            Point::new(5, 10),
            Point::new(0, 10),
        ];
        assert_abs_diff_eq!(contour_area(&l_shape), 75.0);
        assert_abs_diff_eq!(hull_area(&l_shape), 87.5);
    }

    #[test]
    fn test_fit_ellipse_circle_ratio_near_one() {
        let circle = ellipse_points(100.0, 100.0, 40.0, 40.0, 64);
        let axes = fit_ellipse(&circle).unwrap();
        assert_abs_diff_eq!(axes.ratio().unwrap(), 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(axes.width, 80.0, epsilon = 3.0);
    }

    #[test]
    fn test_fit_ellipse_elongated_ratio() {
        let ellipse = ellipse_points(200.0, 120.0, 60.0, 20.0, 90);
        let axes = fit_ellipse(&ellipse).unwrap();
        assert_abs_diff_eq!(axes.ratio().unwrap(), 1.0 / 3.0, epsilon = 0.05);
    }

    #[test]
    fn test_fit_ellipse_needs_five_points() {
        assert!(fit_ellipse(&rect(0, 0, 10, 10)).is_none());
    }
}
