//! Ring configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RingError};
use crate::partitioner::HashAlgorithm;
use crate::ring::{HashRing, DEFAULT_VIRTUAL_NODES};
use crate::shard::ShardId;

/// Parameters that fully determine ring placement for a given shard list.
///
/// Changing either field remaps keys; both are fixed for a process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_virtual_node_count")]
    pub virtual_node_count: usize,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

fn default_virtual_node_count() -> usize {
    DEFAULT_VIRTUAL_NODES
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            virtual_node_count: DEFAULT_VIRTUAL_NODES,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.virtual_node_count == 0 {
            return Err(RingError::InvalidConfig(
                "virtual_node_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Validate and build the ring for `shards`.
    pub fn build_ring<I, S>(&self, shards: I) -> Result<Arc<HashRing>>
    where
        I: IntoIterator<Item = S>,
        S: Into<ShardId>,
    {
        self.validate()?;
        Ok(Arc::new(HashRing::build_with(
            shards,
            self.virtual_node_count,
            self.hash_algorithm.partitioner(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: RingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RingConfig::default());
        assert_eq!(config.virtual_node_count, 100);
    }

    #[test]
    fn test_zero_vnodes_rejected() {
        let config = RingConfig { virtual_node_count: 0, ..RingConfig::default() };
        assert!(matches!(config.build_ring(["a"]), Err(RingError::InvalidConfig(_))));
    }

    #[test]
    fn test_build_uses_algorithm() {
        let config = RingConfig { hash_algorithm: HashAlgorithm::Xxh3, ..RingConfig::default() };
        let ring = config.build_ring(["a", "b"]).unwrap();
        assert_eq!(ring.partitioner_name(), "xxh3-128");
        assert_eq!(ring.token_count() + ring.collisions(), 200);
    }
}
