//! Ring arithmetic over token positions.

use std::fmt::Debug;
use std::hash::Hash;

/// A position on a circular hash space.
///
/// Positions are totally ordered and the space wraps from [`Token::max`]
/// back to [`Token::zero`], so distances are always measured clockwise.
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + 'static {
    fn zero() -> Self;

    fn max() -> Self;

    /// Clockwise distance from `self` to `other`, wrapping past `max()`.
    fn distance_to(&self, other: &Self) -> Self;

    /// Share of the whole ring this value spans when read as a distance.
    fn as_fraction(&self) -> f64;
}
