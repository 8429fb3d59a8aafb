//! Ring topology views.
//!
//! Read-only summaries computed over a built ring: how much of the hash space
//! each shard owns, and how a sample of keys actually lands.

use std::collections::BTreeMap;

use crate::ring::HashRing;
use crate::shard::ShardId;
use crate::token::Token;

/// Ownership report over a ring.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Fraction of the hash space owned by each shard; sums to 1.0 for a
    /// non-empty ring.
    pub ownership: BTreeMap<ShardId, f64>,
}

impl Topology {
    /// Compute the hash-space share of every shard.
    ///
    /// A position owns the half-open arc from its predecessor (exclusive) up
    /// to itself (inclusive); the smallest position also owns the wrapped arc
    /// past the largest one.
    pub fn of(ring: &HashRing) -> Self {
        let mut ownership: BTreeMap<ShardId, f64> =
            ring.shards().iter().map(|s| (s.clone(), 0.0)).collect();

        let tokens = ring.tokens();
        if let [(_, only)] = tokens {
            ownership.insert(only.clone(), 1.0);
            return Self { ownership };
        }

        for (i, (token, shard)) in tokens.iter().enumerate() {
            let prev = if i == 0 { &tokens[tokens.len() - 1].0 } else { &tokens[i - 1].0 };
            *ownership.entry(shard.clone()).or_insert(0.0) += prev.distance_to(token).as_fraction();
        }
        Self { ownership }
    }

    /// Route `keys` through the ring and count hits per shard.
    pub fn sample<'a, I>(ring: &HashRing, keys: I) -> BTreeMap<ShardId, usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: BTreeMap<ShardId, usize> =
            ring.shards().iter().map(|s| (s.clone(), 0)).collect();
        for key in keys {
            if let Ok(shard) = ring.get_node(key) {
                *counts.entry(shard.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn share(&self, shard: &ShardId) -> f64 {
        self.ownership.get(shard).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_sums_to_one() {
        let ring = HashRing::build(["shard_1", "shard_2", "shard_3"], 100);
        let topology = Topology::of(&ring);
        let total: f64 = topology.ownership.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "total was {total}");
        for share in topology.ownership.values() {
            assert!(*share > 0.15 && *share < 0.55, "share {share} out of range");
        }
    }

    #[test]
    fn test_single_position_owns_everything() {
        let ring = HashRing::build(["solo"], 1);
        let topology = Topology::of(&ring);
        assert_eq!(topology.share(&ShardId::new("solo")), 1.0);
    }

    #[test]
    fn test_empty_ring_has_no_owners() {
        let ring = HashRing::build(Vec::<ShardId>::new(), 10);
        assert!(Topology::of(&ring).ownership.is_empty());
    }

    #[test]
    fn test_sample_counts_every_key() {
        let ring = HashRing::build(["a", "b"], 20);
        let keys: Vec<String> = (0..500).map(|i| i.to_string()).collect();
        let counts = Topology::sample(&ring, keys.iter().map(String::as_str));
        assert_eq!(counts.values().sum::<usize>(), 500);
    }
}
