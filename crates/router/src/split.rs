//! Primary/replica read-write split.
//!
//! A plain dispatch variant of the router: writes always go to the primary,
//! reads always go to the replica. No key routing is involved; replication
//! between the two is the storage layer's concern.

use std::sync::Arc;

use tracing::info;

use corelib::ShardId;
use sessions::ShardSessionFactory;

use crate::error::RouterError;
use crate::record::Record;
use crate::router::{insert_on, select_all_on, select_on};

/// Sends writes to `primary` and reads to `replica`.
#[derive(Debug, Clone)]
pub struct ReadWriteSplit {
    sessions: Arc<ShardSessionFactory>,
    primary: ShardId,
    replica: ShardId,
}

impl ReadWriteSplit {
    /// Both shards must have a registered pool.
    pub fn new(
        sessions: Arc<ShardSessionFactory>,
        primary: impl Into<ShardId>,
        replica: impl Into<ShardId>,
    ) -> Result<Self, RouterError> {
        let primary = primary.into();
        let replica = replica.into();
        for shard in [&primary, &replica] {
            if !sessions.contains(shard) {
                return Err(RouterError::UnknownShard(shard.clone()));
            }
        }
        info!(primary = %primary, replica = %replica, "read/write split configured");
        Ok(Self {
            sessions,
            primary,
            replica,
        })
    }

    pub fn primary(&self) -> &ShardId {
        &self.primary
    }

    pub fn replica(&self) -> &ShardId {
        &self.replica
    }

    /// Insert on the primary.
    pub async fn create<R: Record>(&self, entity: &R) -> Result<R, RouterError> {
        insert_on(&self.sessions, &self.primary, entity).await
    }

    /// Read one record from the replica.
    pub async fn get<R: Record>(&self, key: &R::Key) -> Result<R, RouterError> {
        select_on(&self.sessions, &self.replica, key).await
    }

    /// Read every record from the replica.
    pub async fn list<R: Record>(&self) -> Result<Vec<R>, RouterError> {
        select_all_on(&self.sessions, &self.replica).await
    }
}
