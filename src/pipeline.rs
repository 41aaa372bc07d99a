//! Frame analysis pipeline
//!
//! Filter → segment → extract → score for one frame of OCR output. The
//! pipeline holds configuration only; every call is a pure function of the
//! fragments and the reference set, so a single instance can serve a whole
//! scan session.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{score, ReferenceSet, Tier};
use crate::error::ConfigError;
use crate::geometry::Rectangle;
use crate::vision::{
    BlockExtractor, BlockSegmenter, CandidateFilter, ExtractorConfig, FilterConfig,
    NumericCandidate, OcrFrame, SegmenterConfig, TextFragment,
};

/// Settings for every pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub segmenter: SegmenterConfig,
    pub extractor: ExtractorConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;
        self.segmenter.validate()?;
        self.extractor.validate()
    }
}

/// Which physical block a result describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockPosition {
    Upper,
    Lower,
}

impl BlockPosition {
    pub fn index(&self) -> u8 {
        match self {
            BlockPosition::Upper => 1,
            BlockPosition::Lower => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockPosition::Upper => "upper",
            BlockPosition::Lower => "lower",
        }
    }
}

/// Analysis of one ticket block in one frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockResult {
    /// 1 for the upper block, 2 for the lower block
    pub block_index: u8,
    /// Block outline in OCR pixel space
    pub bounding_rect: Rectangle,
    /// Distinct numbers read from the block, at most 15
    pub numbers: Vec<u8>,
    pub match_count: u8,
    pub tier: Tier,
}

impl BlockResult {
    pub fn position(&self) -> BlockPosition {
        if self.block_index == 1 {
            BlockPosition::Upper
        } else {
            BlockPosition::Lower
        }
    }

    /// One-line status, e.g. `Block 1 (upper): FULL 15/15`
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} ({}): {} {}/{}",
            self.block_index,
            self.position().label(),
            self.tier,
            self.match_count,
            crate::analysis::FULL_MATCH
        )
    }
}

/// Pipeline output plus diagnostics for one frame
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Block results ordered by `block_index`
    pub blocks: Vec<BlockResult>,
    /// Fragments received from the OCR provider
    pub fragment_count: usize,
    /// Fragments that survived filtering
    pub candidate_count: usize,
    /// Time spent in the pipeline
    pub processing_time: Duration,
}

/// Frame analysis pipeline
#[derive(Debug, Clone, Default)]
pub struct FramePipeline {
    filter: CandidateFilter,
    segmenter: BlockSegmenter,
    extractor: BlockExtractor,
}

impl FramePipeline {
    /// Create a pipeline with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with custom settings
    ///
    /// Settings are checked here so that analysis itself has no error path.
    pub fn with_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            filter: CandidateFilter::new(config.filter),
            segmenter: BlockSegmenter::new(config.segmenter),
            extractor: BlockExtractor::new(config.extractor),
        })
    }

    /// Analyze one frame's fragments
    ///
    /// Returns at most two results ordered by block index. Blocks with no
    /// candidates are left out, so an empty frame yields an empty list and a
    /// frame showing one block yields one result.
    pub fn analyze(&self, fragments: &[TextFragment], reference: &ReferenceSet) -> Vec<BlockResult> {
        self.run(fragments, None, reference).0
    }

    /// Analyze a frame, using its dimensions and reporting diagnostics
    pub fn analyze_frame(&self, frame: &OcrFrame, reference: &ReferenceSet) -> FrameAnalysis {
        let start = Instant::now();
        let (blocks, candidate_count) = self.run(&frame.fragments, frame.dimensions(), reference);
        let processing_time = start.elapsed();

        debug!(
            "Frame analysis complete in {:?}: {} fragments, {} candidates, {} blocks",
            processing_time,
            frame.fragments.len(),
            candidate_count,
            blocks.len()
        );

        FrameAnalysis {
            blocks,
            fragment_count: frame.fragments.len(),
            candidate_count,
            processing_time,
        }
    }

    fn run(
        &self,
        fragments: &[TextFragment],
        frame: Option<(u32, u32)>,
        reference: &ReferenceSet,
    ) -> (Vec<BlockResult>, usize) {
        let candidates = self.filter.filter(fragments);
        if candidates.is_empty() {
            debug!("No ticket numbers among {} fragments", fragments.len());
            return (Vec::new(), 0);
        }

        let (upper, lower) = self
            .segmenter
            .segment_in_frame(&candidates, frame.map(|(_, height)| height));
        debug!(
            "Upper block: {} candidates, lower block: {} candidates",
            upper.len(),
            lower.len()
        );

        let blocks = [(BlockPosition::Upper, upper), (BlockPosition::Lower, lower)]
            .into_iter()
            .filter(|(_, group)| !group.is_empty())
            .map(|(position, group)| self.block_result(position, &group, frame, reference))
            .collect();

        (blocks, candidates.len())
    }

    fn block_result(
        &self,
        position: BlockPosition,
        group: &[NumericCandidate],
        frame: Option<(u32, u32)>,
        reference: &ReferenceSet,
    ) -> BlockResult {
        let extracted = self.extractor.extract_in_frame(group, frame);
        let scored = score(&extracted.numbers, reference);

        let result = BlockResult {
            block_index: position.index(),
            bounding_rect: extracted.bounding_rect,
            numbers: extracted.numbers,
            match_count: scored.match_count,
            tier: scored.tier,
        };
        debug!(
            "{}: {} candidates, rect {:?}, numbers {:?}",
            result,
            group.len(),
            result.bounding_rect,
            result.numbers
        );
        result
    }
}
