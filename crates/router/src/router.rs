//! Key-routed entity operations.
//!
//! Every operation follows the same linear path:
//!
//! ```text
//! resolve shard -> acquire session -> execute -> commit | rollback -> release -> return
//! ```
//!
//! Routing is purely key-derived. There is no retry against another shard
//! and no cross-shard fallback: a key that resolved to shard A when it was
//! written resolves to shard A on every later read, as long as the shard
//! list, virtual node count and hash algorithm are unchanged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use corelib::{HashRing, ShardId};
use sessions::{
    Connector, MemoryShard, SessionError, SessionHandle, ShardSessionFactory, Statement,
};

use crate::config::{ShardConfig, ShardingConfig};
use crate::error::{ConfigError, RouterError};
use crate::record::Record;

/// Routes record reads and writes to the shard owning their primary key.
#[derive(Debug, Clone)]
pub struct EntityRouter {
    ring: Arc<HashRing>,
    sessions: Arc<ShardSessionFactory>,
}

impl EntityRouter {
    pub fn new(ring: Arc<HashRing>, sessions: Arc<ShardSessionFactory>) -> Self {
        for shard in ring.shards() {
            if !sessions.contains(shard) {
                warn!(shard = %shard, "ring shard has no session pool");
            }
        }
        Self { ring, sessions }
    }

    /// Build the ring and one pool per configured shard.
    ///
    /// `connect` turns each shard's descriptor into a connector.
    pub fn from_config<F>(config: &ShardingConfig, mut connect: F) -> Result<Self, RouterError>
    where
        F: FnMut(&ShardConfig) -> Result<Arc<dyn Connector>, ConfigError>,
    {
        config.validate()?;
        let ring = config.ring.build_ring(config.shard_ids().cloned())?;

        let mut sessions = ShardSessionFactory::new();
        for shard in &config.shards {
            sessions.register(shard.id.clone(), shard.pool.clone(), connect(shard)?);
        }
        Ok(Self::new(ring, Arc::new(sessions)))
    }

    /// Router over in-memory engines, one per configured `memory://` shard.
    pub fn in_memory(
        config: &ShardingConfig,
    ) -> Result<(Self, HashMap<ShardId, Arc<MemoryShard>>), RouterError> {
        let mut backends = HashMap::new();
        let router = Self::from_config(config, |shard| {
            let (connector, backend) = shard.memory_connector()?;
            backends.insert(shard.id.clone(), backend);
            Ok(connector)
        })?;
        Ok((router, backends))
    }

    pub fn ring(&self) -> &Arc<HashRing> {
        &self.ring
    }

    pub fn sessions(&self) -> &Arc<ShardSessionFactory> {
        &self.sessions
    }

    /// Shard owning the routing key `key`.
    pub fn shard_for(&self, key: &str) -> Result<&ShardId, RouterError> {
        Ok(self.ring.get_node(key)?)
    }

    /// Persist `entity` on the shard owning its primary key.
    ///
    /// Returns the row as stored, mapped back to the record type. Any
    /// persistence failure is rolled back and reported as
    /// [`RouterError::CreateFailed`].
    pub async fn create<R: Record>(&self, entity: &R) -> Result<R, RouterError> {
        let key = R::routing_key(&entity.primary_key());
        let shard = self.shard_for(&key)?.clone();
        info!(table = R::TABLE, %key, shard = %shard, "routing create");
        insert_on(&self.sessions, &shard, entity).await
    }

    /// Fetch the record with primary key `key` from its owning shard.
    pub async fn get<R: Record>(&self, key: &R::Key) -> Result<R, RouterError> {
        let routing_key = R::routing_key(key);
        let shard = self.shard_for(&routing_key)?.clone();
        info!(table = R::TABLE, key = %routing_key, shard = %shard, "routing get");
        select_on(&self.sessions, &shard, key).await
    }
}

async fn open(
    sessions: &ShardSessionFactory,
    shard: &ShardId,
) -> Result<SessionHandle, RouterError> {
    sessions
        .open(shard)
        .await
        .map_err(|e| RouterError::from_open(shard, e))
}

/// Insert and commit `entity` on `shard`, rolling back on any failure.
pub(crate) async fn insert_on<R: Record>(
    sessions: &ShardSessionFactory,
    shard: &ShardId,
    entity: &R,
) -> Result<R, RouterError> {
    let started = Instant::now();
    let key = R::routing_key(&entity.primary_key());
    let mut session = open(sessions, shard).await?;

    let statement = Statement::insert(R::TABLE, R::KEY_COLUMN, entity.to_row());
    let outcome = async {
        let rows = session.execute(&statement).await?;
        session.commit().await?;
        Ok::<_, SessionError>(rows)
    }
    .await;

    let rows = match outcome {
        Ok(rows) => rows,
        Err(cause) => {
            if let Err(rollback) = session.rollback().await {
                warn!(shard = %shard, error = %rollback, "rollback failed, discarding on release");
            }
            session.release();
            error!(
                table = R::TABLE,
                %key,
                shard = %shard,
                error = %cause,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "create failed"
            );
            metrics::counter!("router_create_total", "shard" => shard.to_string(), "outcome" => "failed")
                .increment(1);
            return Err(RouterError::CreateFailed {
                shard: shard.clone(),
                cause,
            });
        }
    };
    session.release();
    debug!(shard = %shard, "session released");

    info!(
        table = R::TABLE,
        %key,
        shard = %shard,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "committed create"
    );
    metrics::counter!("router_create_total", "shard" => shard.to_string(), "outcome" => "ok")
        .increment(1);

    match rows.first() {
        Some(row) => R::from_row(row).map_err(|cause| RouterError::Decode {
            shard: shard.clone(),
            cause,
        }),
        // Engines that do not return the stored row: the write is committed
        // exactly as sent.
        None => R::from_row(&entity.to_row()).map_err(|cause| RouterError::Decode {
            shard: shard.clone(),
            cause,
        }),
    }
}

/// Select the record keyed by `key` on `shard`.
pub(crate) async fn select_on<R: Record>(
    sessions: &ShardSessionFactory,
    shard: &ShardId,
    key: &R::Key,
) -> Result<R, RouterError> {
    let routing_key = R::routing_key(key);
    let mut session = open(sessions, shard).await?;

    let statement = Statement::select_by_key(R::TABLE, R::KEY_COLUMN, key.clone());
    let result = session.execute(&statement).await;
    session.release();
    debug!(shard = %shard, "session released");

    let rows = result.map_err(|cause| {
        error!(table = R::TABLE, key = %routing_key, shard = %shard, error = %cause, "read failed");
        metrics::counter!("router_get_total", "shard" => shard.to_string(), "outcome" => "failed")
            .increment(1);
        RouterError::ReadFailed {
            shard: shard.clone(),
            cause,
        }
    })?;

    let Some(row) = rows.first() else {
        warn!(table = R::TABLE, key = %routing_key, shard = %shard, "record not found");
        metrics::counter!("router_get_total", "shard" => shard.to_string(), "outcome" => "not_found")
            .increment(1);
        return Err(RouterError::NotFound {
            shard: shard.clone(),
            table: R::TABLE,
            key: routing_key,
        });
    };

    info!(table = R::TABLE, key = %routing_key, shard = %shard, "retrieved record");
    metrics::counter!("router_get_total", "shard" => shard.to_string(), "outcome" => "ok")
        .increment(1);
    R::from_row(row).map_err(|cause| RouterError::Decode {
        shard: shard.clone(),
        cause,
    })
}

/// Select every record of type `R` on `shard`.
pub(crate) async fn select_all_on<R: Record>(
    sessions: &ShardSessionFactory,
    shard: &ShardId,
) -> Result<Vec<R>, RouterError> {
    let mut session = open(sessions, shard).await?;
    let result = session.execute(&Statement::select_all(R::TABLE)).await;
    session.release();

    let rows = result.map_err(|cause| RouterError::ReadFailed {
        shard: shard.clone(),
        cause,
    })?;
    info!(table = R::TABLE, shard = %shard, rows = rows.len(), "listed records");
    rows.iter()
        .map(|row| {
            R::from_row(row).map_err(|cause| RouterError::Decode {
                shard: shard.clone(),
                cause,
            })
        })
        .collect()
}
