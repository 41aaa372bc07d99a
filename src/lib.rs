//! LottoScanner - match lottery tickets against chosen numbers from OCR output
//!
//! Each camera frame's OCR fragments are filtered to ticket numbers, split
//! into the ticket's upper and lower blocks, read and scored against the
//! player's 15 numbers. Capture, text recognition and drawing belong to the
//! embedding application; this crate only sees text and boxes.

pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod scan;
pub mod vision;

pub use analysis::{ReferenceSet, Tier};
pub use error::ConfigError;
pub use geometry::Rectangle;
pub use pipeline::{BlockPosition, BlockResult, FrameAnalysis, FramePipeline, PipelineConfig};
pub use vision::{NumericCandidate, OcrFrame, SegmentationStrategy, TextFragment};
