//! # Value Objects
//!
//! Immutable value types for the Observer Registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::RegistryError;

/// Fraction of a ballot's voter list that must agree for finalization.
///
/// Kept as an exact rational so that "≥ ceil(T·N) votes" is computed without
/// floating point: `votes · denominator ≥ numerator · N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Threshold {
    numerator: u64,
    denominator: u64,
}

impl Threshold {
    /// Two thirds of the voter list.
    pub const TWO_THIRDS: Threshold = Threshold {
        numerator: 2,
        denominator: 3,
    };

    /// Create a threshold.
    ///
    /// Must be a strict majority and at most 1: `1/2 < n/d ≤ 1`. Anything at
    /// or below one half would let two disjoint halves finalize opposite
    /// outcomes.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, RegistryError> {
        let threshold = Self {
            numerator,
            denominator,
        };
        threshold.validate()?;
        Ok(threshold)
    }

    /// Re-check the supermajority bounds (used on deserialized values).
    pub fn validate(&self) -> Result<(), RegistryError> {
        let valid = self.denominator > 0
            && self.numerator <= self.denominator
            && (self.numerator as u128) * 2 > self.denominator as u128;
        if valid {
            Ok(())
        } else {
            Err(RegistryError::InvalidThreshold {
                numerator: self.numerator,
                denominator: self.denominator,
            })
        }
    }

    /// Numerator.
    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    /// Denominator.
    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// `ceil(T · total)`: the smallest vote count that reaches the threshold.
    pub fn required_votes(&self, total: u64) -> u64 {
        let product = self.numerator as u128 * total as u128;
        let d = self.denominator as u128;
        (product.div_ceil(d)) as u64
    }

    /// True if `votes` out of `total` reaches the threshold.
    ///
    /// An empty voter list never reaches any threshold.
    pub fn is_reached(&self, votes: u64, total: u64) -> bool {
        total > 0 && votes as u128 * self.denominator as u128 >= self.numerator as u128 * total as u128
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::TWO_THIRDS
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
