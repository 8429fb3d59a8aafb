//! 128-bit hash token.

use crate::token::traits::Token;
use std::fmt;

/// Position in the 128-bit hash space `0..=u128::MAX`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HashToken(pub u128);

impl Token for HashToken {
    fn zero() -> Self {
        HashToken(0)
    }

    fn max() -> Self {
        HashToken(u128::MAX)
    }

    fn distance_to(&self, other: &Self) -> Self {
        HashToken(other.0.wrapping_sub(self.0))
    }

    /// In `[0, 1)`.
    fn as_fraction(&self) -> f64 {
        // 2^128 as f64 is exact.
        self.0 as f64 / 340_282_366_920_938_463_463_374_607_431_768_211_456.0
    }
}

impl fmt::Display for HashToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
