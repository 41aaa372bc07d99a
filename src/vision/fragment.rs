//! OCR output as seen by the scanner
//!
//! Provider adapters normalize whatever their engine returns into
//! [`TextFragment`]s. Coordinates must already be rotated into the frame's
//! upright orientation before they get here.

use serde::{Deserialize, Serialize};

use crate::geometry::Rectangle;

/// One recognized OCR token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Recognized text
    pub text: String,
    /// Bounding box in frame pixels, if the provider reported one
    #[serde(default, rename = "box", alias = "bounding_box")]
    pub bounding_box: Option<Rectangle>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounding_box: Rectangle) -> Self {
        Self {
            text: text.into(),
            bounding_box: Some(bounding_box),
        }
    }

    /// Fragment without geometry (always rejected by the filter)
    pub fn unplaced(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bounding_box: None,
        }
    }

    /// Build from an (x, y, width, height) box
    pub fn from_xywh(text: impl Into<String>, bounds: (u32, u32, u32, u32)) -> Self {
        let (x, y, width, height) = bounds;
        Self::new(
            text,
            Rectangle::from_xywh(to_coord(x), to_coord(y), to_coord(width), to_coord(height)),
        )
    }

    /// Build from polygon points, using their axis-aligned bounds
    ///
    /// An empty polygon yields a fragment with no bounding box.
    pub fn from_polygon(text: impl Into<String>, polygon: &[(f32, f32)]) -> Self {
        Self {
            text: text.into(),
            bounding_box: polygon_to_bounds(polygon),
        }
    }
}

/// All OCR fragments recognized in one camera frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrFrame {
    /// Image width reported by the OCR provider (0 if unknown)
    #[serde(default)]
    pub width: u32,
    /// Image height reported by the OCR provider (0 if unknown)
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fragments: Vec<TextFragment>,
}

impl OcrFrame {
    pub fn new(width: u32, height: u32, fragments: Vec<TextFragment>) -> Self {
        Self {
            width,
            height,
            fragments,
        }
    }

    /// Frame dimensions, if the provider reported them
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        (self.width > 0 && self.height > 0).then_some((self.width, self.height))
    }
}

fn to_coord(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Convert polygon points to an axis-aligned bounding box
fn polygon_to_bounds(polygon: &[(f32, f32)]) -> Option<Rectangle> {
    if polygon.is_empty() {
        return None;
    }

    let min_x = polygon.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let min_y = polygon.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_x = polygon.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let max_y = polygon.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

    Some(Rectangle::new(
        min_x.floor() as i32,
        min_y.floor() as i32,
        max_x.ceil() as i32,
        max_y.ceil() as i32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xywh() {
        let fragment = TextFragment::from_xywh("42", (10, 20, 30, 40));
        assert_eq!(fragment.bounding_box, Some(Rectangle::new(10, 20, 40, 60)));
    }

    #[test]
    fn test_from_polygon() {
        let polygon = [(10.2, 20.0), (39.5, 21.0), (40.0, 59.9), (10.0, 60.0)];
        let fragment = TextFragment::from_polygon("7", &polygon);
        assert_eq!(fragment.bounding_box, Some(Rectangle::new(10, 20, 40, 60)));
    }

    #[test]
    fn test_from_empty_polygon_has_no_box() {
        let fragment = TextFragment::from_polygon("7", &[]);
        assert!(fragment.bounding_box.is_none());
    }

    #[test]
    fn test_frame_dimensions() {
        assert_eq!(OcrFrame::new(720, 1280, vec![]).dimensions(), Some((720, 1280)));
        assert_eq!(OcrFrame::default().dimensions(), None);
    }

    #[test]
    fn test_fragment_json_shape() {
        let json = r#"{"text":"15","box":{"left":1,"top":2,"right":3,"bottom":4}}"#;
        let fragment: TextFragment = serde_json::from_str(json).unwrap();
        assert_eq!(fragment.text, "15");
        assert_eq!(fragment.bounding_box, Some(Rectangle::new(1, 2, 3, 4)));

        let missing: TextFragment = serde_json::from_str(r#"{"text":"15"}"#).unwrap();
        assert!(missing.bounding_box.is_none());
    }

    #[test]
    fn test_recorded_reversed_box_is_normalized() {
        let json = r#"{"text":"42","box":{"left":500,"top":900,"right":100,"bottom":100}}"#;
        let fragment: TextFragment = serde_json::from_str(json).unwrap();
        let rect = fragment.bounding_box.unwrap();
        assert_eq!(rect, Rectangle::new(100, 100, 500, 900));
        assert!(rect.left <= rect.right && rect.top <= rect.bottom);
    }
}
