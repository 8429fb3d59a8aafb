//! Sharding configuration.
//!
//! One value, loaded once at startup and passed by reference into the ring
//! and session factory. Changing the shard list, the virtual node count or
//! the hash algorithm remaps keys, so all three are fixed for the life of
//! the process.
//!
//! ```json
//! {
//!   "virtual_node_count": 100,
//!   "hash_algorithm": "blake3-128",
//!   "shards": [
//!     { "id": "shard_1", "address": "memory://shard_1",
//!       "pool": { "max_size": 10, "acquire_timeout_ms": 5000 } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use corelib::{RingConfig, ShardId};
use sessions::{Connector, MemoryConnector, MemoryShard, PoolConfig};

use crate::error::ConfigError;

/// Address scheme served by the in-memory engine.
pub const MEMORY_SCHEME: &str = "memory://";

/// Complete static configuration of the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingConfig {
    #[serde(flatten)]
    pub ring: RingConfig,
    /// Ordered shard list; order matters for collision resolution.
    #[serde(default)]
    pub shards: Vec<ShardConfig>,
}

/// One shard's connection descriptor and pool bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardConfig {
    pub id: ShardId,
    /// Connection descriptor, e.g. `memory://shard_1`.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub pool: PoolConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ShardingConfig {
    /// Parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// `count` in-memory shards named `shard_1..=shard_count`.
    pub fn local(count: usize) -> Self {
        Self {
            ring: RingConfig::default(),
            shards: (1..=count)
                .map(|i| ShardConfig::memory(format!("shard_{i}")))
                .collect(),
        }
    }

    /// Reject configurations that cannot produce a usable router.
    ///
    /// An empty shard list is accepted: the ring is then empty and every
    /// lookup fails with an empty-ring error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ring
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut seen = HashSet::new();
        for shard in &self.shards {
            if shard.id.as_str().trim().is_empty() {
                return Err(ConfigError::Invalid("shard id must not be empty".into()));
            }
            if !seen.insert(&shard.id) {
                return Err(ConfigError::Invalid(format!("duplicate shard id {}", shard.id)));
            }
            if shard.pool.max_size == 0 {
                return Err(ConfigError::Invalid(format!(
                    "shard {} has a pool max_size of 0",
                    shard.id
                )));
            }
        }
        Ok(())
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = &ShardId> {
        self.shards.iter().map(|s| &s.id)
    }
}

impl ShardConfig {
    /// Shard served by a fresh in-memory engine.
    pub fn memory(id: impl Into<ShardId>) -> Self {
        let id = id.into();
        Self {
            address: format!("{MEMORY_SCHEME}{id}"),
            id,
            credentials: None,
            pool: PoolConfig::default(),
        }
    }

    /// Build the in-memory connector for a `memory://` address.
    ///
    /// Returns the engine alongside so callers can inspect committed data.
    pub fn memory_connector(&self) -> Result<(Arc<dyn Connector>, Arc<MemoryShard>), ConfigError> {
        let name = self.address.strip_prefix(MEMORY_SCHEME).ok_or_else(|| {
            ConfigError::UnsupportedAddress {
                shard: self.id.clone(),
                address: self.address.clone(),
            }
        })?;
        let name = if name.is_empty() { self.id.as_str() } else { name };
        let backend = MemoryShard::new(name);
        Ok((Arc::new(MemoryConnector::new(Arc::clone(&backend))), backend))
    }
}
