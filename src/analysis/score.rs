//! Match scoring
//!
//! Prize tiers are a fixed domain rule: all 15 numbers win, 13 or 14 earn a
//! partial prize, anything less earns nothing.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::reference::ReferenceSet;

/// Matches needed for a full win
pub const FULL_MATCH: u8 = 15;
/// Fewest matches that earn a partial prize
pub const PARTIAL_MATCH_MIN: u8 = 13;

/// Match classification of one ticket block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    /// All 15 numbers matched
    Full,
    /// 13 or 14 numbers matched
    Partial,
    /// 12 or fewer
    None,
}

impl Tier {
    pub fn from_match_count(match_count: u8) -> Self {
        match match_count {
            n if n >= FULL_MATCH => Tier::Full,
            n if n >= PARTIAL_MATCH_MIN => Tier::Partial,
            _ => Tier::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Full => "FULL",
            Tier::Partial => "PARTIAL",
            Tier::None => "NONE",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of scoring one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub match_count: u8,
    pub tier: Tier,
}

/// Count the distinct `numbers` present in `reference` and classify the count
pub fn score(numbers: &[u8], reference: &ReferenceSet) -> MatchScore {
    let distinct: BTreeSet<u8> = numbers.iter().copied().collect();
    let match_count = distinct.iter().filter(|n| reference.contains(**n)).count();
    // Bounded by the reference size
    let match_count = u8::try_from(match_count).unwrap_or(u8::MAX).min(FULL_MATCH);

    MatchScore {
        match_count,
        tier: Tier::from_match_count(match_count),
    }
}
