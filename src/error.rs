//! Error types
//!
//! Per-frame analysis never fails; OCR noise is filtered silently. The only
//! errors the library raises are configuration errors, reported once when a
//! scan session is set up.

use thiserror::Error;

/// Configuration errors detected at session start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Too few reference numbers
    #[error("reference set needs {expected} numbers, {missing} more required")]
    TooFewNumbers { expected: usize, missing: usize },

    /// Too many reference numbers
    #[error("reference set needs {expected} numbers, {excess} too many")]
    TooManyNumbers { expected: usize, excess: usize },

    /// A reference number outside the printable ticket range
    #[error("reference number {value} is outside {min}..={max}")]
    NumberOutOfRange { value: u32, min: u8, max: u8 },

    /// The same reference number given twice
    #[error("reference number {value} appears more than once")]
    DuplicateNumber { value: u8 },

    /// A scanner setting with an unusable value
    #[error("invalid setting `{field}`: {message}")]
    InvalidSetting { field: &'static str, message: String },
}
