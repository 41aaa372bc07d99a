//! Geometry primitives
//!
//! Axis-aligned rectangles in the OCR provider's pixel space.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (left, top, right, bottom)
///
/// Coordinates are in a single frame-consistent space, normally the pixel
/// grid of the image the OCR provider reported for that frame. Deserialized
/// rectangles go through [`Rectangle::new`], so edges are always ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawRectangle")]
pub struct Rectangle {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Edges as they appear in a recorded frame, possibly reversed
#[derive(Deserialize)]
struct RawRectangle {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl From<RawRectangle> for Rectangle {
    fn from(raw: RawRectangle) -> Self {
        Rectangle::new(raw.left, raw.top, raw.right, raw.bottom)
    }
}

impl Rectangle {
    /// Create a rectangle, swapping reversed edges so `left <= right` and `top <= bottom`
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Create a rectangle from an origin and a size
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Zero-area rectangle at the origin
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Horizontal center (integer division, rounds toward `left`)
    pub fn center_x(&self) -> i32 {
        self.left + self.width() / 2
    }

    /// Vertical center (integer division, rounds toward `top`)
    pub fn center_y(&self) -> i32 {
        self.top + self.height() / 2
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow every side by `padding`
    pub fn padded(&self, padding: i32) -> Rectangle {
        Rectangle::new(
            self.left.saturating_sub(padding),
            self.top.saturating_sub(padding),
            self.right.saturating_add(padding),
            self.bottom.saturating_add(padding),
        )
    }

    /// Clamp to `[0, width] x [0, height]`
    pub fn clamped(&self, width: u32, height: u32) -> Rectangle {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX);
        Rectangle::new(
            self.left.clamp(0, max_x),
            self.top.clamp(0, max_y),
            self.right.clamp(0, max_x),
            self.bottom.clamp(0, max_y),
        )
    }
}

/// Union of all rectangles, or `None` for an empty iterator
pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rectangle>) -> Option<Rectangle> {
    rects.into_iter().fold(None, |acc, rect| match acc {
        Some(bounds) => Some(bounds.union(rect)),
        None => Some(*rect),
    })
}
