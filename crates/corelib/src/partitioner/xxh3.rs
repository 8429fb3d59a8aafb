//! XXH3-128 partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::HashToken;
use xxhash_rust::xxh3::xxh3_128;

/// XXH3 128-bit partitioner (seed 0). Faster than BLAKE3, not cryptographic.
#[derive(Clone, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    fn partition(&self, key: &[u8]) -> HashToken {
        HashToken(xxh3_128(key))
    }

    fn name(&self) -> &'static str {
        "xxh3-128"
    }
}
