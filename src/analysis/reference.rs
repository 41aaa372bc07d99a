//! Reference numbers chosen by the player

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::vision::{BLOCK_SIZE, MAX_TICKET_NUMBER, MIN_TICKET_NUMBER};

/// The 15 numbers a scanned ticket is checked against
///
/// Always holds exactly [`BLOCK_SIZE`] distinct values within the ticket
/// range. Fixed for the lifetime of a scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    numbers: BTreeSet<u8>,
}

impl ReferenceSet {
    /// Validate an explicit list of numbers
    ///
    /// Unlike [`ReferenceSet::parse`], nothing is dropped silently: any
    /// out-of-range value or duplicate is an error.
    pub fn new(numbers: impl IntoIterator<Item = u32>) -> Result<Self, ConfigError> {
        let mut set = BTreeSet::new();
        for value in numbers {
            let number = u8::try_from(value)
                .ok()
                .filter(|n| (MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER).contains(n))
                .ok_or(ConfigError::NumberOutOfRange {
                    value,
                    min: MIN_TICKET_NUMBER,
                    max: MAX_TICKET_NUMBER,
                })?;
            if !set.insert(number) {
                return Err(ConfigError::DuplicateNumber { value: number });
            }
        }
        Self::from_set(set)
    }

    /// Parse free-form input such as `"1, 5 17,42"`
    ///
    /// Tokens are separated by commas and/or whitespace. Tokens that are not
    /// ticket numbers are ignored and repeats collapse, the way the number
    /// entry field behaves while the player is typing. The result must still
    /// hold exactly [`BLOCK_SIZE`] numbers.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let set: BTreeSet<u8> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .filter_map(|token| token.parse::<u8>().ok())
            .filter(|n| (MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER).contains(n))
            .collect();
        Self::from_set(set)
    }

    fn from_set(numbers: BTreeSet<u8>) -> Result<Self, ConfigError> {
        match numbers.len() {
            BLOCK_SIZE => Ok(Self { numbers }),
            n if n < BLOCK_SIZE => Err(ConfigError::TooFewNumbers {
                expected: BLOCK_SIZE,
                missing: BLOCK_SIZE - n,
            }),
            n => Err(ConfigError::TooManyNumbers {
                expected: BLOCK_SIZE,
                excess: n - BLOCK_SIZE,
            }),
        }
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }

    /// Numbers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.numbers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl FromStr for ReferenceSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReferenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self.numbers.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", numbers.join(", "))
    }
}
