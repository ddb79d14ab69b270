use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::point::Point;

use crate::core::geometry::BBox;

/// Picks the largest closed ink region not anchored at the page corner and returns its
/// bounding box in points.
#[derive(Debug, Clone)]
pub struct ContourTableFinder {
    buffer: i32,
    ink_threshold: u8,
}

impl ContourTableFinder {
    pub fn new(buffer: i32, ink_threshold: u8) -> Self {
        Self {
            buffer,
            ink_threshold,
        }
    }

    pub fn find(&self, image: &GrayImage, horizontal_ratio: f32, vertical_ratio: f32) -> Option<BBox> {
        let binary = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if image.get_pixel(x, y)[0] < self.ink_threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let mut best: Option<(f64, (i32, i32, i32, i32))> = None;
        for contour in find_contours::<i32>(&binary) {
            let Some(rect) = bounding_rect(&contour.points) else {
                continue;
            };
            if rect.0 <= 1 || rect.1 <= 1 {
                continue;
            }
            let area = polygon_area(&contour.points);
            if best.map_or(true, |(best_area, _)| area > best_area) {
                best = Some((area, rect));
            }
        }

        let (_, (x, y, w, h)) = best?;
        Some(BBox::from_pixels(
            x - self.buffer,
            y,
            w + self.buffer,
            h,
            horizontal_ratio,
            vertical_ratio,
        ))
    }
}

/// `(x, y, width, height)` with inclusive pixel extents.
fn bounding_rect(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Shoelace area of the closed polygon through `points`.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}
