//! Block segmentation
//!
//! Splits one frame's numeric candidates into the ticket's upper and lower
//! blocks. The two printed blocks are separated by a margin wider than any
//! row spacing inside a block, so by default the split is placed in the
//! widest vertical gap between candidate centers.
//!
//! Segmentation is a pure function of the candidate set: candidates are put
//! into a canonical order first, so the permutation the OCR provider happened
//! to return them in never changes the result.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ConfigError;
use crate::vision::filter::NumericCandidate;

/// How the upper/lower boundary is chosen
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// Split inside the widest gap between consecutive vertical centers
    #[default]
    GapBased,
    /// Split halfway between the highest and lowest vertical center
    MidpointRange,
    /// Split at a fixed fraction of the frame height
    ///
    /// Falls back to the candidates' vertical extent when the frame height
    /// is unknown.
    FixedFraction { fraction: f32 },
}

/// Segmenter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub strategy: SegmentationStrategy,
    /// Centers closer than this count as the same row
    pub row_tolerance: i32,
    /// How much wider than a typical row spacing the block gap must be
    ///
    /// The widest row gap is compared with the median of the other row gaps;
    /// below `gap_ratio` times that, all candidates are treated as one block.
    pub gap_ratio: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            strategy: SegmentationStrategy::GapBased,
            row_tolerance: 8,
            gap_ratio: 1.5,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_tolerance < 0 {
            return Err(ConfigError::InvalidSetting {
                field: "segmenter.row_tolerance",
                message: format!("must not be negative, got {}", self.row_tolerance),
            });
        }
        if self.gap_ratio.is_nan() || self.gap_ratio < 1.0 {
            return Err(ConfigError::InvalidSetting {
                field: "segmenter.gap_ratio",
                message: format!("must be at least 1.0, got {}", self.gap_ratio),
            });
        }
        if let SegmentationStrategy::FixedFraction { fraction } = self.strategy {
            if fraction.is_nan() || fraction <= 0.0 || fraction >= 1.0 {
                return Err(ConfigError::InvalidSetting {
                    field: "segmenter.strategy.fraction",
                    message: format!("must be between 0 and 1, got {}", fraction),
                });
            }
        }
        Ok(())
    }
}

/// Partitions candidates into (upper, lower) ticket blocks
#[derive(Debug, Clone, Default)]
pub struct BlockSegmenter {
    config: SegmenterConfig,
}

impl BlockSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn with_strategy(strategy: SegmentationStrategy) -> Self {
        Self::new(SegmenterConfig {
            strategy,
            ..Default::default()
        })
    }

    /// Split candidates without frame context
    pub fn segment(
        &self,
        candidates: &[NumericCandidate],
    ) -> (Vec<NumericCandidate>, Vec<NumericCandidate>) {
        self.segment_in_frame(candidates, None)
    }

    /// Split candidates, using the frame height when it is known
    ///
    /// Every candidate ends up in exactly one of the two groups. Both groups
    /// are returned in canonical (top-to-bottom, left-to-right) order.
    pub fn segment_in_frame(
        &self,
        candidates: &[NumericCandidate],
        frame_height: Option<u32>,
    ) -> (Vec<NumericCandidate>, Vec<NumericCandidate>) {
        if candidates.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let mut sorted = candidates.to_vec();
        sorted.sort_by_key(canonical_key);

        let split = match self.config.strategy {
            SegmentationStrategy::GapBased => self.gap_split(&sorted, frame_height),
            SegmentationStrategy::MidpointRange => {
                let min = sorted.first().map(center_y).unwrap_or_default();
                let max = sorted.last().map(center_y).unwrap_or_default();
                Split::Boundary((min + max) / 2.0)
            }
            SegmentationStrategy::FixedFraction { fraction } => {
                let boundary = match frame_height.filter(|h| *h > 0) {
                    Some(height) => height as f64 * fraction as f64,
                    None => {
                        let top = sorted.iter().map(|c| c.position.top).min().unwrap_or_default();
                        let bottom = sorted.iter().map(|c| c.position.bottom).max().unwrap_or_default();
                        top as f64 + (bottom - top) as f64 * fraction as f64
                    }
                };
                Split::Boundary(boundary)
            }
        };

        trace!("Segmenting {} candidates: {:?}", sorted.len(), split);

        match split {
            Split::Boundary(boundary) => sorted.into_iter().partition(|c| center_y(c) < boundary),
            Split::Index(index) => {
                let lower = sorted.split_off(index);
                (sorted, lower)
            }
        }
    }

    fn gap_split(&self, sorted: &[NumericCandidate], frame_height: Option<u32>) -> Split {
        let tolerance = self.config.row_tolerance;
        let centers: Vec<i32> = sorted.iter().map(|c| c.position.center_y()).collect();
        // Gaps within the tolerance separate candidates on the same row
        let row_gaps: Vec<(usize, i32)> = centers
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .enumerate()
            .filter(|&(_, gap)| gap > tolerance)
            .collect();

        let widest = row_gaps.iter().map(|&(_, gap)| gap).max().unwrap_or(0);
        // Among equally wide gaps take the lowest, so a stray token between the
        // blocks reads last in the upper block and falls behind the cap
        let Some((index, gap)) = row_gaps
            .iter()
            .rev()
            .copied()
            .find(|&(_, gap)| gap.saturating_add(tolerance) >= widest)
        else {
            // Everything sits in one row, no vertical information to split on
            return Split::Index(sorted.len().div_ceil(2));
        };

        let mut others: Vec<i32> = row_gaps
            .iter()
            .filter(|&&(i, _)| i != index)
            .map(|&(_, gap)| gap)
            .collect();
        others.sort_unstable();

        if let Some(&typical) = others.get(others.len() / 2) {
            if (gap as f32) < self.config.gap_ratio * typical as f32 {
                return single_block(sorted, frame_height);
            }
        }

        Split::Boundary((centers[index] as f64 + centers[index + 1] as f64) / 2.0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Split {
    /// Centers strictly above the boundary are upper
    Boundary(f64),
    /// The first `n` canonical candidates are upper
    Index(usize),
}

/// All candidates form one block; decide which slot it occupies
fn single_block(sorted: &[NumericCandidate], frame_height: Option<u32>) -> Split {
    let in_lower_half = frame_height.filter(|h| *h > 0).is_some_and(|height| {
        let mean = sorted.iter().map(center_y).sum::<f64>() / sorted.len() as f64;
        mean >= height as f64 / 2.0
    });
    if in_lower_half {
        Split::Index(0)
    } else {
        Split::Index(sorted.len())
    }
}

fn center_y(candidate: &NumericCandidate) -> f64 {
    candidate.position.center_y() as f64
}

fn canonical_key(c: &NumericCandidate) -> (i32, i32, u8, i32, i32, i32, i32) {
    let p = c.position;
    (p.center_y(), p.center_x(), c.value, p.top, p.left, p.bottom, p.right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;

    fn candidate(value: u8, x: i32, y: i32) -> NumericCandidate {
        NumericCandidate {
            value,
            position: Rectangle::from_xywh(x, y, 40, 40),
        }
    }

    /// 15 numbers laid out as 3 rows of 5, rows 100 units apart
    fn block(first_value: u8, top: i32) -> Vec<NumericCandidate> {
        (0..15u8)
            .map(|i| {
                let row = (i / 5) as i32;
                let col = (i % 5) as i32;
                candidate(first_value + i, 50 + col * 120, top + row * 100)
            })
            .collect()
    }

    fn values(group: &[NumericCandidate]) -> Vec<u8> {
        let mut v: Vec<u8> = group.iter().map(|c| c.value).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_empty_input() {
        let (upper, lower) = BlockSegmenter::default().segment(&[]);
        assert!(upper.is_empty());
        assert!(lower.is_empty());
    }

    #[test]
    fn test_gap_split_two_blocks() {
        let mut candidates = block(1, 100);
        candidates.extend(block(76, 900));

        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(values(&upper), (1..=15).collect::<Vec<u8>>());
        assert_eq!(values(&lower), (76..=90).collect::<Vec<u8>>());
    }

    #[test]
    fn test_gap_split_uneven_rows() {
        // Block rows spaced irregularly, block gap still the widest by far
        let mut candidates = vec![
            candidate(1, 0, 100),
            candidate(2, 0, 160),
            candidate(3, 0, 250),
            candidate(4, 0, 800),
            candidate(5, 0, 830),
            candidate(6, 0, 940),
        ];
        candidates.reverse();
        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(values(&upper), vec![1, 2, 3]);
        assert_eq!(values(&lower), vec![4, 5, 6]);
    }

    #[test]
    fn test_stray_token_between_blocks() {
        let mut candidates = block(1, 100);
        candidates.extend(block(76, 900));
        // Equally far from both blocks, so the two widest gaps tie
        candidates.push(candidate(50, 300, 600));

        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        let mut expected_upper: Vec<u8> = (1..=15).collect();
        expected_upper.push(50);
        assert_eq!(values(&upper), expected_upper);
        assert_eq!(values(&lower), (76..=90).collect::<Vec<u8>>());
    }

    #[test]
    fn test_narrow_margin_between_blocks() {
        // Lower block starts 180 below the last upper row, rows are 100 apart
        let mut candidates = block(1, 100);
        candidates.extend(block(76, 480));

        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(values(&upper), (1..=15).collect::<Vec<u8>>());
        assert_eq!(values(&lower), (76..=90).collect::<Vec<u8>>());
    }

    #[test]
    fn test_two_rows_split_without_reference_spacing() {
        // A single row gap has nothing to compare against, so it splits
        let candidates = vec![candidate(1, 0, 100), candidate(2, 100, 100), candidate(3, 0, 700)];
        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(values(&upper), vec![1, 2]);
        assert_eq!(values(&lower), vec![3]);
    }

    #[test]
    fn test_single_cluster_goes_to_one_group() {
        let candidates = block(1, 100);
        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(upper.len(), 15);
        assert!(lower.is_empty());
    }

    #[test]
    fn test_single_cluster_in_lower_half_of_frame() {
        let candidates = block(1, 900);
        let (upper, lower) = BlockSegmenter::default().segment_in_frame(&candidates, Some(1280));
        assert!(upper.is_empty());
        assert_eq!(lower.len(), 15);
    }

    #[test]
    fn test_single_row_splits_at_median_index() {
        let candidates: Vec<NumericCandidate> =
            (1..=5).map(|v| candidate(v, v as i32 * 100, 200)).collect();
        let (upper, lower) = BlockSegmenter::default().segment(&candidates);
        assert_eq!(values(&upper), vec![1, 2, 3]);
        assert_eq!(values(&lower), vec![4, 5]);
    }

    #[test]
    fn test_single_candidate() {
        let (upper, lower) = BlockSegmenter::default().segment(&[candidate(9, 0, 0)]);
        assert_eq!(upper.len(), 1);
        assert!(lower.is_empty());
    }

    #[test]
    fn test_midpoint_range() {
        let candidates = vec![
            candidate(1, 0, 0),   // center 20
            candidate(2, 0, 50),  // center 70
            candidate(3, 0, 100), // center 120, boundary is 70
        ];
        let segmenter = BlockSegmenter::with_strategy(SegmentationStrategy::MidpointRange);
        let (upper, lower) = segmenter.segment(&candidates);
        assert_eq!(values(&upper), vec![1]);
        assert_eq!(values(&lower), vec![2, 3]);
    }

    #[test]
    fn test_fixed_fraction_uses_frame_height() {
        let candidates = vec![candidate(1, 0, 100), candidate(2, 0, 500), candidate(3, 0, 700)];
        let segmenter =
            BlockSegmenter::with_strategy(SegmentationStrategy::FixedFraction { fraction: 0.5 });

        let (upper, lower) = segmenter.segment_in_frame(&candidates, Some(1280));
        assert_eq!(values(&upper), vec![1, 2]);
        assert_eq!(values(&lower), vec![3]);

        // Without a frame the candidates' extent (100..740) is used instead
        let (upper, lower) = segmenter.segment(&candidates);
        assert_eq!(values(&upper), vec![1]);
        assert_eq!(values(&lower), vec![2, 3]);
    }

    #[test]
    fn test_partition_is_complete() {
        let mut candidates = block(1, 100);
        candidates.extend(block(50, 700));
        candidates.push(candidate(88, 300, 400));

        for strategy in [
            SegmentationStrategy::GapBased,
            SegmentationStrategy::MidpointRange,
            SegmentationStrategy::FixedFraction { fraction: 0.4 },
        ] {
            let (upper, lower) = BlockSegmenter::with_strategy(strategy).segment(&candidates);
            assert_eq!(upper.len() + lower.len(), candidates.len(), "{:?}", strategy);

            let mut all: Vec<NumericCandidate> = upper.into_iter().chain(lower).collect();
            let mut expected = candidates.clone();
            all.sort_by_key(canonical_key);
            expected.sort_by_key(canonical_key);
            assert_eq!(all, expected);
        }
    }

    #[test]
    fn test_order_independent() {
        let mut candidates = block(1, 100);
        candidates.extend(block(76, 900));
        let segmenter = BlockSegmenter::default();
        let expected = segmenter.segment(&candidates);

        candidates.reverse();
        assert_eq!(segmenter.segment(&candidates), expected);

        candidates.rotate_left(7);
        assert_eq!(segmenter.segment(&candidates), expected);
    }

    #[test]
    fn test_validate_config() {
        assert!(SegmenterConfig::default().validate().is_ok());

        let bad = SegmenterConfig {
            strategy: SegmentationStrategy::FixedFraction { fraction: 1.5 },
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = SegmenterConfig {
            gap_ratio: 0.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
