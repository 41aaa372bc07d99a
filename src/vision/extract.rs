//! Block extraction
//!
//! Reads the numbers of one ticket block in printed order (row by row, left
//! to right), keeps the first occurrence of each value and stops at the
//! block size.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{union_all, Rectangle};
use crate::vision::filter::NumericCandidate;

/// Numbers printed in one ticket block
pub const BLOCK_SIZE: usize = 15;

/// Extractor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Height of a row bucket used to order candidates row-then-column
    pub row_height: i32,
    /// Extra margin added around the block rectangle
    pub padding: i32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            row_height: 20,
            padding: 0,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_height <= 0 {
            return Err(ConfigError::InvalidSetting {
                field: "extractor.row_height",
                message: format!("must be positive, got {}", self.row_height),
            });
        }
        if self.padding < 0 {
            return Err(ConfigError::InvalidSetting {
                field: "extractor.padding",
                message: format!("must not be negative, got {}", self.padding),
            });
        }
        Ok(())
    }
}

/// Numbers and outline of one ticket block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    /// Distinct values in reading order, at most [`BLOCK_SIZE`]
    pub numbers: Vec<u8>,
    /// Union of the candidates' boxes (plus padding)
    pub bounding_rect: Rectangle,
}

#[derive(Debug, Clone, Default)]
pub struct BlockExtractor {
    config: ExtractorConfig,
}

impl BlockExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract a block without frame context
    pub fn extract(&self, group: &[NumericCandidate]) -> ExtractedBlock {
        self.extract_in_frame(group, None)
    }

    /// Extract a block; padded rectangles are clamped to the frame when known
    ///
    /// An empty group yields no numbers and a zero-area rectangle. Callers
    /// skip empty groups rather than report them.
    pub fn extract_in_frame(
        &self,
        group: &[NumericCandidate],
        frame: Option<(u32, u32)>,
    ) -> ExtractedBlock {
        let mut ordered: Vec<&NumericCandidate> = group.iter().collect();
        ordered.sort_by_key(|c| self.reading_order(c));

        let mut numbers: Vec<u8> = Vec::with_capacity(BLOCK_SIZE);
        for candidate in ordered {
            if numbers.len() >= BLOCK_SIZE {
                break;
            }
            if !numbers.contains(&candidate.value) {
                numbers.push(candidate.value);
            }
        }

        let bounding_rect = match union_all(group.iter().map(|c| &c.position)) {
            Some(bounds) if self.config.padding > 0 => {
                let padded = bounds.padded(self.config.padding);
                match frame {
                    Some((width, height)) => padded.clamped(width, height),
                    None => Rectangle::new(
                        padded.left.max(0),
                        padded.top.max(0),
                        padded.right.max(0),
                        padded.bottom.max(0),
                    ),
                }
            }
            Some(bounds) => bounds,
            None => Rectangle::empty(),
        };

        ExtractedBlock {
            numbers,
            bounding_rect,
        }
    }

    fn reading_order(&self, c: &NumericCandidate) -> (i32, i32, u8, i32, i32, i32) {
        let p = c.position;
        (
            p.top.div_euclid(self.config.row_height),
            p.left,
            c.value,
            p.top,
            p.right,
            p.bottom,
        )
    }
}
