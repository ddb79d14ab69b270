use serde::{Deserialize, Serialize};

/// Axis-aligned box in document units (points).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Builds a box from an image-space rectangle and the page scale ratios.
    pub fn from_pixels(
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        horizontal_ratio: f32,
        vertical_ratio: f32,
    ) -> Self {
        Self {
            x0: left as f32 * horizontal_ratio,
            y0: top as f32 * vertical_ratio,
            x1: (left + width) as f32 * horizontal_ratio,
            y1: (top + height) as f32 * vertical_ratio,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Straight line segment in image pixels.
///
/// Constructors normalise the end points so that `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Segment {
    pub fn horizontal(y: i32, x_start: i32, x_end: i32) -> Self {
        Self {
            x1: x_start.min(x_end),
            y1: y,
            x2: x_start.max(x_end),
            y2: y,
        }
    }

    pub fn vertical(x: i32, y_start: i32, y_end: i32) -> Self {
        Self {
            x1: x,
            y1: y_start.min(y_end),
            x2: x,
            y2: y_start.max(y_end),
        }
    }

    /// `None` for diagonal segments, which the table engines do not model.
    pub fn orientation(&self) -> Option<Orientation> {
        if self.y1 == self.y2 {
            Some(Orientation::Horizontal)
        } else if self.x1 == self.x2 {
            Some(Orientation::Vertical)
        } else {
            None
        }
    }

    pub fn length(&self) -> i32 {
        (self.x2 - self.x1).abs().max((self.y2 - self.y1).abs())
    }
}
