use std::collections::BTreeSet;

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing::debug;

use crate::core::config::LineSettings;
use crate::core::geometry::Segment;

/// Finds axis-aligned rules on a page.
///
/// Hough voting proposes infinite lines at 0° (vertical) and 90° (horizontal); each
/// proposal is then walked through the edge map and cut into finite segments, joining
/// gaps of at most `max_line_gap` and keeping pieces at least `min_line_length` long.
#[derive(Debug, Clone)]
pub struct LineDetector {
    settings: LineSettings,
}

impl LineDetector {
    pub fn new(settings: LineSettings) -> Self {
        Self { settings }
    }

    pub fn detect(&self, image: &GrayImage) -> Vec<Segment> {
        let edges = canny(image, self.settings.canny_low, self.settings.canny_high);
        let options = LineDetectionOptions {
            vote_threshold: self.settings.hough_vote_threshold,
            suppression_radius: self.settings.hough_suppression_radius,
        };

        let mut segments = BTreeSet::new();
        for line in detect_lines(&edges, options) {
            let r = line.r.round() as i32;
            match line.angle_in_degrees {
                0 if r >= 0 && (r as u32) < edges.width() => {
                    for (start, end) in self.walk(&edges, r, false) {
                        segments.insert(Segment::vertical(r, start, end));
                    }
                }
                90 if r >= 0 && (r as u32) < edges.height() => {
                    for (start, end) in self.walk(&edges, r, true) {
                        segments.insert(Segment::horizontal(r, start, end));
                    }
                }
                _ => {}
            }
        }

        debug!(count = segments.len(), "detected rule segments");
        segments.into_iter().collect()
    }

    /// Runs of edge pixels along row (or column) `at`, tolerating one pixel of drift.
    fn walk(&self, edges: &GrayImage, at: i32, horizontal: bool) -> Vec<(i32, i32)> {
        let (along, across) = if horizontal {
            (edges.width() as i32, edges.height() as i32)
        } else {
            (edges.height() as i32, edges.width() as i32)
        };
        let hit = |i: i32| {
            (at - 1..=at + 1)
                .filter(|&a| a >= 0 && a < across)
                .any(|a| {
                    let (x, y) = if horizontal { (i, a) } else { (a, i) };
                    edges.get_pixel(x as u32, y as u32)[0] > 0
                })
        };
        join_runs(
            (0..along).map(hit),
            self.settings.max_line_gap,
            self.settings.min_line_length,
        )
    }
}

/// Collapses a boolean profile into `(first, last)` runs of `true`, bridging gaps of at
/// most `max_gap` and dropping runs shorter than `min_len`.
fn join_runs(profile: impl Iterator<Item = bool>, max_gap: i32, min_len: i32) -> Vec<(i32, i32)> {
    let mut runs = Vec::new();
    let mut current: Option<(i32, i32)> = None;
    for (i, on) in profile.enumerate() {
        if !on {
            continue;
        }
        let i = i as i32;
        current = match current {
            Some((start, last)) if i - last - 1 <= max_gap => Some((start, i)),
            Some(done) => {
                runs.push(done);
                Some((i, i))
            }
            None => Some((i, i)),
        };
    }
    runs.extend(current);
    runs.retain(|(start, end)| end - start >= min_len);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Orientation;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use pretty_assertions::assert_eq;

    #[test]
    fn bridges_small_gaps_and_drops_short_runs() {
        let profile = [1, 1, 1, 0, 0, 1, 1, 0, 0, 0, 0, 1, 0]
            .into_iter()
            .map(|v| v == 1);
        assert_eq!(join_runs(profile, 2, 3), vec![(0, 6)]);
    }

    #[test]
    fn finds_ruled_grid_lines() {
        let mut image = GrayImage::from_pixel(600, 400, Luma([255]));
        draw_filled_rect_mut(&mut image, Rect::at(50, 100).of_size(500, 4), Luma([0]));
        draw_filled_rect_mut(&mut image, Rect::at(300, 20).of_size(4, 360), Luma([0]));

        let segments = LineDetector::new(LineSettings::default()).detect(&image);

        assert!(segments.iter().any(|s| {
            s.orientation() == Some(Orientation::Horizontal)
                && (s.y1 - 102).abs() <= 4
                && s.length() >= 450
        }));
        assert!(segments.iter().any(|s| {
            s.orientation() == Some(Orientation::Vertical)
                && (s.x1 - 302).abs() <= 4
                && s.length() >= 300
        }));
    }

    #[test]
    fn blank_page_has_no_lines() {
        let image = GrayImage::from_pixel(300, 300, Luma([255]));
        assert!(LineDetector::new(LineSettings::default()).detect(&image).is_empty());
    }
}
