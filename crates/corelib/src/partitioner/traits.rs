//! Key hashing onto the ring.

use crate::token::HashToken;

/// Maps key bytes to a ring position.
///
/// Implementations hold no state and must be a pure function of the input:
/// no per-process seeds, no platform-dependent byte order. Two processes
/// built from the same configuration must place every key identically.
pub trait Partitioner: Send + Sync + 'static {
    /// Position of `key` on the ring.
    fn partition(&self, key: &[u8]) -> HashToken;

    /// Stable algorithm name, as written in configuration.
    fn name(&self) -> &'static str;
}
