//! Candidate filter
//!
//! Turns raw OCR fragments into ticket-number candidates. Anything that
//! cannot be a printed ticket number is dropped without an error: on a live
//! camera feed most fragments are noise, and that is the normal case.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ConfigError;
use crate::geometry::Rectangle;
use crate::vision::fragment::TextFragment;

/// Smallest number printed on a ticket
pub const MIN_TICKET_NUMBER: u8 = 1;
/// Largest number printed on a ticket
pub const MAX_TICKET_NUMBER: u8 = 90;
/// Longest token that can hold a ticket number
///
/// Three-character tokens are misread concatenations of neighbouring cells.
pub const MAX_TOKEN_LEN: usize = 2;

/// A fragment that parsed to a plausible ticket number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumericCandidate {
    /// Parsed value, always within `MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER`
    pub value: u8,
    /// Where the fragment was detected
    pub position: Rectangle,
}

/// Size and length limits for candidate fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Maximum token length in characters
    pub max_text_len: usize,
    /// Maximum bounding box width (glyph size at the preview resolution)
    pub max_width: i32,
    /// Maximum bounding box height
    pub max_height: i32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_text_len: MAX_TOKEN_LEN,
            max_width: 200,
            max_height: 100,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_text_len == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "filter.max_text_len",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_width <= 0 || self.max_height <= 0 {
            return Err(ConfigError::InvalidSetting {
                field: "filter.max_width/max_height",
                message: format!(
                    "box limits must be positive, got {}x{}",
                    self.max_width, self.max_height
                ),
            });
        }
        Ok(())
    }
}

/// Filters OCR fragments down to numeric candidates
#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    config: FilterConfig,
}

impl CandidateFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Keep the fragments that parse to a ticket number, in input order
    pub fn filter(&self, fragments: &[TextFragment]) -> Vec<NumericCandidate> {
        fragments
            .iter()
            .filter_map(|fragment| self.candidate(fragment))
            .collect()
    }

    /// Convert a single fragment, or `None` if it is noise
    pub fn candidate(&self, fragment: &TextFragment) -> Option<NumericCandidate> {
        let Some(position) = fragment.bounding_box else {
            trace!("Dropping {:?}: no bounding box", fragment.text);
            return None;
        };

        let text = fragment.text.trim();
        let len = text.chars().count();
        if len == 0 || len > self.config.max_text_len {
            trace!("Dropping {:?}: length {}", fragment.text, len);
            return None;
        }

        if position.width() > self.config.max_width || position.height() > self.config.max_height {
            trace!(
                "Dropping {:?}: box {}x{} too large",
                fragment.text,
                position.width(),
                position.height()
            );
            return None;
        }

        let value = parse_ticket_number(text)?;
        Some(NumericCandidate { value, position })
    }
}

/// Parse a base-10 ticket number, rejecting signs and out-of-range values
pub fn parse_ticket_number(text: &str) -> Option<u8> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = text.parse().ok()?;
    let value = u8::try_from(value).ok()?;
    (MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER)
        .contains(&value)
        .then_some(value)
}
