// src/video/annotate.rs

use super::Annotation;
use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use std::path::Path;

const LABEL_SCALE: f32 = 18.0;
const LABEL_OFFSET_Y: i32 = 10;
const MARKER_RADIUS: i32 = 3;

/// Draws region outlines, centroid markers and (when a font is available)
/// `"Cat N: label"` text onto RGB frames.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(font: Option<FontVec>) -> Self {
        Self { font }
    }

    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Invalid font {}: {}", path.display(), e))?;
        Ok(Self { font: Some(font) })
    }

    pub fn draw(&self, img: &mut RgbImage, annotations: &[Annotation]) {
        for a in annotations {
            let color = Rgb(a.color);

            if let Some(outline) = &a.outline {
                let n = outline.len();
                for i in 0..n {
                    let p = outline[i];
                    let q = outline[(i + 1) % n];
                    draw_line_segment_mut(
                        img,
                        (p.x as f32, p.y as f32),
                        (q.x as f32, q.y as f32),
                        color,
                    );
                }
            }

            if let Some(anchor) = a.anchor {
                draw_filled_circle_mut(img, (anchor.x, anchor.y), MARKER_RADIUS, color);
                if let Some(font) = &self.font {
                    draw_text_mut(
                        img,
                        color,
                        anchor.x,
                        anchor.y - LABEL_OFFSET_Y - LABEL_SCALE as i32,
                        PxScale::from(LABEL_SCALE),
                        font,
                        &a.text(),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorLabel;
    use crate::types::Centroid;
    use imageproc::point::Point;

    #[test]
    fn test_outline_and_marker_are_drawn() {
        let mut img = RgbImage::new(50, 50);
        let annotation = Annotation {
            slot_id: 1,
            label: BehaviorLabel::Resting,
            outline: Some(vec![
                Point::new(5, 5),
                Point::new(40, 5),
                Point::new(40, 40),
                Point::new(5, 40),
            ]),
            anchor: Some(Centroid::new(22, 22)),
            color: [0, 255, 0],
        };

        Annotator::new(None).draw(&mut img, &[annotation.clone()]);

        assert_eq!(img.get_pixel(20, 5).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(22, 22).0, [0, 255, 0]);
        assert_eq!(img.get_pixel(30, 30).0, [0, 0, 0]);
        assert_eq!(annotation.text(), "Cat 1: resting");
    }

    #[test]
    fn test_anchor_near_edge_does_not_panic() {
        let mut img = RgbImage::new(10, 10);
        let annotation = Annotation {
            slot_id: 2,
            label: BehaviorLabel::Unknown,
            outline: None,
            anchor: Some(Centroid::new(0, 0)),
            color: [0, 0, 255],
        };
        Annotator::new(None).draw(&mut img, &[annotation]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
    }
}
