//! BLAKE3 partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::HashToken;

/// Truncated BLAKE3 partitioner: the first 16 digest bytes, big-endian.
#[derive(Clone, Debug, Default)]
pub struct Blake3Partitioner;

impl Partitioner for Blake3Partitioner {
    fn partition(&self, key: &[u8]) -> HashToken {
        let digest = blake3::hash(key);
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&digest.as_bytes()[..16]);
        HashToken(u128::from_be_bytes(prefix))
    }

    fn name(&self) -> &'static str {
        "blake3-128"
    }
}
