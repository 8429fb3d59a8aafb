//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Each physical shard is placed on the ring many times, once per virtual node.
//! More positions per shard smooth out the share of the hash space each shard
//! owns:
//!
//! 1. **Better Load Distribution**: More tokens = smoother distribution of keys
//! 2. **Smaller Hot Spots**: A single unlucky gap on the ring matters less
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(N·V) ring entries
//! - **Lookup**: O(log(N·V)) via binary search over the sorted ring
//!
//! Virtual nodes are derived, never persisted: their ring key is
//! `"{shard}#{index}"` and their token is the partitioner's hash of that key.

use crate::partitioner::Partitioner;
use crate::shard::ShardId;
use crate::token::HashToken;

/// Separator between shard id and replica index in a virtual node's ring key.
pub const VNODE_SEPARATOR: char = '#';

/// A virtual node: one replica of a physical shard on the ring.
///
/// # Example
///
/// ```rust
/// use corelib::{ShardId, VirtualNode};
/// use corelib::partitioner::Blake3Partitioner;
///
/// let vnode = VirtualNode::new(ShardId::new("shard_1"), 0);
/// assert_eq!(vnode.ring_key(), "shard_1#0");
/// let _token = vnode.token(&Blake3Partitioner);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNode {
    /// The physical shard that owns this virtual node.
    pub shard: ShardId,

    /// Replica index in `[0, V)`.
    pub index: usize,
}

impl VirtualNode {
    #[inline]
    pub fn new(shard: ShardId, index: usize) -> Self {
        Self { shard, index }
    }

    /// The string hashed to place this virtual node: `shard ++ "#" ++ index`.
    pub fn ring_key(&self) -> String {
        format!("{}{}{}", self.shard, VNODE_SEPARATOR, self.index)
    }

    /// Ring position of this virtual node under `partitioner`.
    pub fn token(&self, partitioner: &dyn Partitioner) -> HashToken {
        partitioner.partition(self.ring_key().as_bytes())
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode({})", self.ring_key())
    }
}
