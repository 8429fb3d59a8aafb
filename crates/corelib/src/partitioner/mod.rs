//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into tokens
//! that can be placed on the hash ring. Routing stability across restarts
//! depends on the algorithm being pinned, so the available algorithms are a
//! closed set selected by name in configuration.

pub mod blake3;
pub mod traits;
pub mod xxh3;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use self::blake3::Blake3Partitioner;
pub use self::xxh3::Xxh3Partitioner;
pub use traits::Partitioner;

/// Pinned hash algorithms a ring may be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// First 16 bytes of the BLAKE3 digest, read big-endian.
    #[default]
    #[serde(rename = "blake3-128")]
    Blake3,
    /// XXH3 128-bit with seed 0.
    #[serde(rename = "xxh3-128")]
    Xxh3,
}

impl HashAlgorithm {
    /// Instantiate the partitioner implementing this algorithm.
    pub fn partitioner(self) -> Arc<dyn Partitioner> {
        match self {
            HashAlgorithm::Blake3 => Arc::new(Blake3Partitioner),
            HashAlgorithm::Xxh3 => Arc::new(Xxh3Partitioner),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3-128",
            HashAlgorithm::Xxh3 => "xxh3-128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
