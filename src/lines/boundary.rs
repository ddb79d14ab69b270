use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::core::config::LineSettings;
use crate::core::geometry::{Orientation, Segment};
use crate::core::model::{AxisExtent, TableLimits};

/// Turns detected rules into the extent of the table grid.
///
/// The vertical axis is measured in y (top to bottom of the grid) and the horizontal axis
/// in x. Each axis is first taken from its longest rule, clipped against the outermost
/// rule of the other axis, and replaced by the spread of the opposite rules when that
/// axis has no rules of its own.
#[derive(Debug, Clone)]
pub struct TableBoundaryResolver {
    buffer: i32,
    ink_threshold: u8,
    thickness: u32,
}

impl TableBoundaryResolver {
    pub fn new(settings: &LineSettings) -> Self {
        Self {
            buffer: settings.buffer,
            ink_threshold: settings.ink_threshold,
            thickness: settings.line_thickness,
        }
    }

    /// `None` when there are no axis-aligned segments at all.
    pub fn resolve(
        &self,
        image: &GrayImage,
        segments: &[Segment],
        is_header: bool,
    ) -> Option<TableLimits> {
        let b = self.buffer;
        let verticals: Vec<&Segment> = segments
            .iter()
            .filter(|s| s.orientation() == Some(Orientation::Vertical))
            .collect();
        let horizontals: Vec<&Segment> = segments
            .iter()
            .filter(|s| s.orientation() == Some(Orientation::Horizontal))
            .collect();
        if verticals.is_empty() && horizontals.is_empty() {
            return None;
        }

        let header_base = if is_header {
            horizontals.iter().map(|s| s.y1).min().map_or(0, |y| y + b)
        } else {
            0
        };

        let mut vertical = AxisExtent::default();
        if let Some(longest) = verticals.iter().max_by_key(|s| s.length()) {
            vertical.max_length = longest.length();
            vertical.start = longest.y1 - b;
            vertical.end = longest.y2 + b;
        }
        vertical.base_line = verticals
            .iter()
            .map(|s| s.x1 - b)
            .filter(|&x| x > 0)
            .min()
            .unwrap_or(0);

        let mut horizontal = AxisExtent::default();
        if let Some(longest) = horizontals.iter().max_by_key(|s| s.length()) {
            horizontal.max_length = longest.length();
            horizontal.start = longest.x1 - b;
            horizontal.end = longest.x2 + b;
        }
        horizontal.base_line = horizontals
            .iter()
            .map(|s| s.y1 - b)
            .filter(|&y| y > header_base)
            .min()
            .unwrap_or(0);

        // Spread of the opposite axis' rules, used when an axis has no rules of its own.
        let vertical_stretch = stretch(horizontals.iter().map(|s| s.y1), b);
        let horizontal_stretch = stretch(verticals.iter().map(|s| s.x1), b);

        if horizontal.base_line > 0 && vertical.start > horizontal.base_line {
            vertical.start = horizontal.base_line;
        }
        if vertical.base_line > 0 && horizontal.start > vertical.base_line {
            horizontal.start = vertical.base_line;
        }

        let found_vertical = !verticals.is_empty();
        let found_horizontal = !horizontals.is_empty();
        if (!found_vertical && found_horizontal) || !is_header {
            if let Some((start, end)) = vertical_stretch {
                vertical.start = start;
                vertical.end = end;
            }
        } else if !found_horizontal && found_vertical {
            if let Some((start, end)) = horizontal_stretch {
                horizontal.start = start;
                horizontal.end = end;
            }
        }

        for seg in &verticals {
            let top = self.ink_top(image, seg.x1, seg.y1);
            vertical.start = vertical.start.min(top);
        }

        Some(TableLimits {
            horizontal,
            vertical,
        })
    }

    /// Walks up from `(x, y)` through ink and returns the topmost ink row of the run.
    fn ink_top(&self, image: &GrayImage, x: i32, y: i32) -> i32 {
        if x < 0 || x as u32 >= image.width() || y < 0 || y as u32 >= image.height() {
            return y;
        }
        let is_ink = |y: i32| image.get_pixel(x as u32, y as u32)[0] < self.ink_threshold;
        if !is_ink(y) {
            return y;
        }
        let mut y = y;
        while y > 0 && is_ink(y - 1) {
            y -= 1;
        }
        y
    }

    /// Redraws every rule across the full resolved extent and closes the grid with
    /// borders at both ends of the horizontal extent.
    pub fn draw_borders(&self, image: &mut GrayImage, segments: &[Segment], limits: &TableLimits) {
        let t = self.thickness as i32;
        let (h, v) = (&limits.horizontal, &limits.vertical);
        for seg in segments {
            match seg.orientation() {
                Some(Orientation::Vertical) => {
                    self.fill(image, seg.x1 - t / 2, v.start, t, v.span());
                }
                Some(Orientation::Horizontal) => {
                    self.fill(image, h.start, seg.y1 - t / 2, h.span(), t);
                }
                _ => {}
            }
        }
        self.fill(image, h.start - t / 2, v.start, t, v.span());
        self.fill(image, h.end - t / 2, v.start, t, v.span());
    }

    fn fill(&self, image: &mut GrayImage, x: i32, y: i32, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        draw_filled_rect_mut(
            image,
            Rect::at(x, y).of_size(width as u32, height as u32),
            Luma([0u8]),
        );
    }
}

fn stretch(values: impl Iterator<Item = i32>, buffer: i32) -> Option<(i32, i32)> {
    let mut bounds: Option<(i32, i32)> = None;
    for v in values {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        });
    }
    bounds.map(|(lo, hi)| (lo - buffer, hi + buffer))
}
