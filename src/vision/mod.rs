//! Vision Layer
//!
//! Interprets OCR output for a ticket frame: filters fragments down to
//! ticket-number candidates, splits them into the two printed blocks and
//! reads each block's numbers.
//!
//! Text recognition itself happens outside this crate. Providers hand over
//! [`TextFragment`]s with boxes already mapped into the upright frame.

pub mod extract;
pub mod filter;
pub mod fragment;
pub mod segment;

pub use extract::{BlockExtractor, ExtractedBlock, ExtractorConfig, BLOCK_SIZE};
pub use filter::{
    CandidateFilter, FilterConfig, NumericCandidate, MAX_TICKET_NUMBER, MAX_TOKEN_LEN,
    MIN_TICKET_NUMBER,
};
pub use fragment::{OcrFrame, TextFragment};
pub use segment::{BlockSegmenter, SegmentationStrategy, SegmenterConfig};
