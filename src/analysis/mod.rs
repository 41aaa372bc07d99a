//! Analysis Layer
//!
//! Compares the numbers read from a ticket block with the player's chosen
//! numbers.

pub mod reference;
pub mod score;

pub use reference::ReferenceSet;
pub use score::{score, MatchScore, Tier, FULL_MATCH, PARTIAL_MATCH_MIN};
