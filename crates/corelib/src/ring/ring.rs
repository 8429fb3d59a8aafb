//! Hash ring data structure.
//!
//! The ring is an immutable, sorted array of `(token, shard)` pairs built once
//! from an ordered shard list and a virtual node count. Only lookups and
//! read-only inspection are public, so a built ring can be shared across
//! threads behind an `Arc` without any locking.
//!
//! # Algorithm
//!
//! Build: for each shard `s` (in order) and each `i` in `[0, V)`, hash
//! `"s#i"` and record `token -> s`. If two virtual nodes land on the same
//! token, the one inserted later wins.
//!
//! Lookup: hash the key, binary-search for the first token `>=` the key's
//! token, and wrap around to the smallest token if there is none.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::error::{Result, RingError};
use crate::partitioner::{Blake3Partitioner, Partitioner};
use crate::shard::ShardId;
use crate::token::HashToken;
use crate::topology::Topology;
use crate::vnode::VirtualNode;

/// Virtual nodes per shard when none is configured.
pub const DEFAULT_VIRTUAL_NODES: usize = 100;

/// Immutable consistent hash ring mapping tokens to shards.
pub struct HashRing {
    /// Sorted by token, tokens unique.
    positions: Vec<(HashToken, ShardId)>,
    /// Configured shards in first-seen order, deduplicated.
    shards: Vec<ShardId>,
    vnodes_per_shard: usize,
    /// Virtual nodes that overwrote an earlier one at the same token.
    collisions: usize,
    partitioner: Arc<dyn Partitioner>,
}

impl HashRing {
    /// Build a ring with the default (BLAKE3) partitioner.
    pub fn build<I, S>(shards: I, virtual_node_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ShardId>,
    {
        Self::build_with(shards, virtual_node_count, Arc::new(Blake3Partitioner))
    }

    /// Build a ring placing `virtual_node_count` tokens per shard.
    ///
    /// Shards are placed in the order given, repeats included: a shard listed
    /// twice places its virtual nodes again and wins any collision against
    /// shards listed between the two entries. With zero shards or zero
    /// virtual nodes the ring is empty and every lookup fails with
    /// [`RingError::EmptyRing`].
    pub fn build_with<I, S>(
        shards: I,
        virtual_node_count: usize,
        partitioner: Arc<dyn Partitioner>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ShardId>,
    {
        let sequence: Vec<ShardId> = shards.into_iter().map(Into::into).collect();
        let mut ordered: Vec<ShardId> = Vec::new();
        for shard in &sequence {
            if !ordered.contains(shard) {
                ordered.push(shard.clone());
            }
        }

        let mut map: BTreeMap<HashToken, ShardId> = BTreeMap::new();
        let mut collisions = 0;
        for shard in &sequence {
            for index in 0..virtual_node_count {
                let vnode = VirtualNode::new(shard.clone(), index);
                let token = vnode.token(partitioner.as_ref());
                trace!(%vnode, %token, "placing virtual node");
                if let Some(previous) = map.insert(token, shard.clone()) {
                    collisions += 1;
                    debug!(%token, %previous, %shard, "virtual node collision, later insert wins");
                }
            }
        }

        let ring = Self {
            positions: map.into_iter().collect(),
            shards: ordered,
            vnodes_per_shard: virtual_node_count,
            collisions,
            partitioner,
        };
        info!(
            shards = ring.shards.len(),
            vnodes_per_shard = virtual_node_count,
            positions = ring.positions.len(),
            collisions,
            partitioner = ring.partitioner.name(),
            "hash ring built"
        );
        ring
    }

    /// Shard owning `key`, where `key` is the stringified primary key.
    pub fn get_node(&self, key: &str) -> Result<&ShardId> {
        self.lookup(key.as_bytes())
    }

    /// Shard owning the raw key bytes.
    pub fn lookup(&self, key: &[u8]) -> Result<&ShardId> {
        if self.positions.is_empty() {
            return Err(RingError::EmptyRing);
        }
        self.owner_of(self.partitioner.partition(key))
    }

    /// Shard owning an arbitrary position on the ring (successor search).
    ///
    /// # Performance
    /// - **Time**: O(log(N·V)) binary search
    pub fn owner_of(&self, token: HashToken) -> Result<&ShardId> {
        let idx = self.positions.partition_point(|(t, _)| *t < token);
        let (owner_token, shard) = match self.positions.get(idx) {
            Some(entry) => entry,
            None => {
                let first = self.positions.first().ok_or(RingError::EmptyRing)?;
                debug!(%token, owner = %first.1, "token past last position, wrapped around");
                first
            }
        };
        debug!(%token, %owner_token, shard = %shard, "resolved ring owner");
        Ok(shard)
    }

    /// Token the ring's partitioner assigns to `key`.
    pub fn hash(&self, key: &[u8]) -> HashToken {
        self.partitioner.partition(key)
    }

    /// Configured shards in build order.
    pub fn shards(&self) -> &[ShardId] {
        &self.shards
    }

    pub fn contains_shard(&self, shard: &ShardId) -> bool {
        self.shards.contains(shard)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of positions on the ring (N·V minus collisions).
    pub fn token_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vnodes_per_shard(&self) -> usize {
        self.vnodes_per_shard
    }

    /// Virtual nodes lost to an identical token placed later.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// All ring positions, sorted by token.
    pub fn tokens(&self) -> &[(HashToken, ShardId)] {
        &self.positions
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }

    /// Fraction of the hash space owned by each shard.
    pub fn ownership(&self) -> BTreeMap<ShardId, f64> {
        Topology::of(self).ownership
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("shards", &self.shards)
            .field("vnodes_per_shard", &self.vnodes_per_shard)
            .field("positions", &self.positions.len())
            .field("collisions", &self.collisions)
            .field("partitioner", &self.partitioner.name())
            .finish()
    }
}

/// Builder for [`HashRing`].
///
/// # Example
///
/// ```rust
/// use corelib::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .with_vnodes(100)
///     .add_shard("shard_1")
///     .add_shard("shard_2")
///     .build();
/// assert_eq!(ring.shard_count(), 2);
/// ```
pub struct RingBuilder {
    shards: Vec<ShardId>,
    vnodes: usize,
    partitioner: Arc<dyn Partitioner>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self {
            shards: Vec::new(),
            vnodes: DEFAULT_VIRTUAL_NODES,
            partitioner: Arc::new(Blake3Partitioner),
        }
    }

    /// Virtual nodes placed per shard.
    pub fn with_vnodes(mut self, vnodes: usize) -> Self {
        self.vnodes = vnodes;
        self
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn add_shard(mut self, shard: impl Into<ShardId>) -> Self {
        self.shards.push(shard.into());
        self
    }

    pub fn add_shards<I, S>(mut self, shards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ShardId>,
    {
        self.shards.extend(shards.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> HashRing {
        HashRing::build_with(self.shards, self.vnodes, self.partitioner)
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}
