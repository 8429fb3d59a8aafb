//! Bounded session pool for a single shard.
//!
//! Capacity is enforced with a semaphore: one permit per session that may be
//! checked out at once. Connections are opened lazily and parked in an idle
//! list when their session is released, so at most `max_size` connections
//! ever exist per shard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, warn};

use corelib::ShardId;

use crate::connection::{Connector, ShardConnection};
use crate::error::SessionError;
use crate::session::SessionHandle;

/// Pool bounds for one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum sessions checked out at once.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// How long `open` waits for a free session.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Fail immediately instead of waiting when the pool is exhausted.
    #[serde(default)]
    pub fail_fast: bool,
}

fn default_max_size() -> usize {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            fail_fast: false,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub max_size: usize,
    /// Connections currently open (idle + checked out).
    pub open: usize,
    pub idle: usize,
    pub in_use: usize,
}

pub(crate) struct ShardPool {
    shard: ShardId,
    config: PoolConfig,
    connector: Arc<dyn Connector>,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Box<dyn ShardConnection>>>,
    open: AtomicUsize,
}

impl ShardPool {
    pub(crate) fn new(shard: ShardId, config: PoolConfig, connector: Arc<dyn Connector>) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(config.max_size)),
            shard,
            config,
            connector,
            idle: Mutex::new(Vec::new()),
            open: AtomicUsize::new(0),
        })
    }

    pub(crate) fn shard(&self) -> &ShardId {
        &self.shard
    }

    pub(crate) fn describe(&self) -> String {
        self.connector.describe()
    }

    /// Lend a session, waiting at most the configured timeout for capacity.
    pub(crate) async fn acquire(self: &Arc<Self>) -> Result<SessionHandle, SessionError> {
        let permit = self.acquire_permit().await?;

        let parked = self.idle.lock().pop();
        let conn = match parked {
            Some(conn) => conn,
            None => {
                let conn = self.connector.connect().await.map_err(|source| {
                    warn!(shard = %self.shard, error = %source, "failed to open connection");
                    SessionError::Connect {
                        shard: self.shard.clone(),
                        source,
                    }
                })?;
                let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(shard = %self.shard, open, "opened new connection");
                conn
            }
        };

        Ok(SessionHandle::new(Arc::clone(self), conn, permit))
    }

    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, SessionError> {
        let permits = Arc::clone(&self.permits);
        if self.config.fail_fast {
            return permits.try_acquire_owned().map_err(|e| match e {
                TryAcquireError::NoPermits => self.exhausted(Duration::ZERO),
                TryAcquireError::Closed => SessionError::Closed(self.shard.clone()),
            });
        }

        let wait = self.config.acquire_timeout();
        match tokio::time::timeout(wait, permits.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(SessionError::Closed(self.shard.clone())),
            Err(_) => Err(self.exhausted(wait)),
        }
    }

    fn exhausted(&self, waited: Duration) -> SessionError {
        warn!(shard = %self.shard, ?waited, max_size = self.config.max_size, "session pool exhausted");
        metrics::counter!("shard_pool_exhausted_total", "shard" => self.shard.to_string())
            .increment(1);
        SessionError::PoolExhausted {
            shard: self.shard.clone(),
            waited,
        }
    }

    /// Return a connection from a released session.
    ///
    /// Any transaction still open is discarded first; broken connections are
    /// closed instead of parked.
    pub(crate) fn reclaim(&self, mut conn: Box<dyn ShardConnection>, broken: bool) {
        // The closed check and the push happen under the idle lock so a
        // concurrent `close` either drains this connection or sees it dropped.
        let mut idle = self.idle.lock();
        if broken || self.permits.is_closed() {
            drop(idle);
            let open = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
            debug!(shard = %self.shard, open, broken, "closing released connection");
            return;
        }
        if conn.in_transaction() {
            warn!(shard = %self.shard, "session released with open transaction, rolling back");
            conn.discard();
        }
        idle.push(conn);
    }

    /// Stop lending sessions; waiters fail with [`SessionError::Closed`].
    pub(crate) fn close(&self) {
        let drained = {
            let mut idle = self.idle.lock();
            self.permits.close();
            std::mem::take(&mut *idle)
        };
        self.open.fetch_sub(drained.len(), Ordering::SeqCst);
    }

    pub(crate) fn status(&self) -> PoolStatus {
        let open = self.open.load(Ordering::SeqCst);
        let idle = self.idle.lock().len();
        PoolStatus {
            max_size: self.config.max_size,
            open,
            idle,
            in_use: self.config.max_size - self.permits.available_permits(),
        }
    }
}
