//! Per-shard session factory.
//!
//! Holds one bounded pool per configured shard. Pools are registered once at
//! startup; afterwards the factory is shared read-only (typically behind an
//! `Arc`) and only lends and reclaims sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use corelib::ShardId;

use crate::connection::Connector;
use crate::error::SessionError;
use crate::memory::{MemoryConnector, MemoryShard};
use crate::pool::{PoolConfig, PoolStatus, ShardPool};
use crate::session::SessionHandle;

/// Lends sessions scoped to individual shards.
#[derive(Default)]
pub struct ShardSessionFactory {
    pools: HashMap<ShardId, Arc<ShardPool>>,
}

impl ShardSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pool for `shard`. Re-registering replaces the old pool.
    pub fn register(
        &mut self,
        shard: impl Into<ShardId>,
        config: PoolConfig,
        connector: Arc<dyn Connector>,
    ) {
        let shard = shard.into();
        info!(
            shard = %shard,
            endpoint = %connector.describe(),
            max_size = config.max_size,
            acquire_timeout_ms = config.acquire_timeout_ms,
            fail_fast = config.fail_fast,
            "registered shard pool"
        );
        self.pools
            .insert(shard.clone(), ShardPool::new(shard, config, connector));
    }

    /// Factory with one fresh in-memory shard per id, all sharing `config`.
    ///
    /// Returns the backing shards so callers can inspect stored data.
    pub fn in_memory<I, S>(shards: I, config: PoolConfig) -> (Self, HashMap<ShardId, Arc<MemoryShard>>)
    where
        I: IntoIterator<Item = S>,
        S: Into<ShardId>,
    {
        let mut factory = Self::new();
        let mut backends = HashMap::new();
        for shard in shards.into_iter().map(Into::into) {
            let backend = MemoryShard::new(shard.as_str());
            factory.register(
                shard.clone(),
                config.clone(),
                Arc::new(MemoryConnector::new(Arc::clone(&backend))),
            );
            backends.insert(shard, backend);
        }
        (factory, backends)
    }

    /// Lend a session from `shard`'s pool.
    ///
    /// Fails with [`SessionError::UnknownShard`] for unregistered shards and
    /// [`SessionError::PoolExhausted`] when no session frees up in time.
    pub async fn open(&self, shard: &ShardId) -> Result<SessionHandle, SessionError> {
        let pool = self
            .pools
            .get(shard)
            .ok_or_else(|| SessionError::UnknownShard(shard.clone()))?;
        debug!(shard = %shard, endpoint = %pool.describe(), "opening session");
        pool.acquire().await
    }

    pub fn contains(&self, shard: &ShardId) -> bool {
        self.pools.contains_key(shard)
    }

    pub fn shards(&self) -> impl Iterator<Item = &ShardId> {
        self.pools.keys()
    }

    pub fn status(&self, shard: &ShardId) -> Option<PoolStatus> {
        self.pools.get(shard).map(|pool| pool.status())
    }

    /// Close every pool. Checked-out sessions finish normally; their
    /// connections are closed on release.
    pub fn close(&self) {
        for pool in self.pools.values() {
            pool.close();
        }
        info!(pools = self.pools.len(), "closed all shard pools");
    }
}

impl std::fmt::Debug for ShardSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSessionFactory")
            .field("shards", &self.pools.keys().collect::<Vec<_>>())
            .finish()
    }
}
