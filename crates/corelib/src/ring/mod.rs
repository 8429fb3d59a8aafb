//! Consistent hash ring implementation.
//!
//! The ring manages token positions and provides efficient lookup
//! operations for finding the shard responsible for a key.

pub mod ring;

pub use ring::{HashRing, RingBuilder, DEFAULT_VIRTUAL_NODES};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;
