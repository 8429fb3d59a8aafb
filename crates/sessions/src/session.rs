//! Scoped session handles.
//!
//! A [`SessionHandle`] owns one pooled connection and one unit of pool
//! capacity. Both go back to the pool exactly once: either through an
//! explicit [`release`](SessionHandle::release) or when the handle is dropped,
//! which also covers early returns and cancelled futures. A handle that goes
//! back with a transaction still open has that transaction rolled back.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

use corelib::ShardId;

use crate::connection::ShardConnection;
use crate::error::{SessionError, StorageError};
use crate::pool::ShardPool;
use crate::value::{Row, Statement};

/// A session lent from one shard's pool.
pub struct SessionHandle {
    pool: Arc<ShardPool>,
    conn: Option<Box<dyn ShardConnection>>,
    permit: Option<OwnedSemaphorePermit>,
    broken: bool,
}

impl SessionHandle {
    pub(crate) fn new(
        pool: Arc<ShardPool>,
        conn: Box<dyn ShardConnection>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        debug!(shard = %pool.shard(), "session opened");
        Self {
            pool,
            conn: Some(conn),
            permit: Some(permit),
            broken: false,
        }
    }

    /// The shard this session is scoped to.
    pub fn shard(&self) -> &ShardId {
        self.pool.shard()
    }

    /// Execute a statement inside the session's transaction.
    pub async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, SessionError> {
        let result = self.conn()?.execute(statement).await;
        self.observe(result)
    }

    pub async fn commit(&mut self) -> Result<(), SessionError> {
        let result = self.conn()?.commit().await;
        self.observe(result)
    }

    pub async fn rollback(&mut self) -> Result<(), SessionError> {
        let result = self.conn()?.rollback().await;
        self.observe(result)
    }

    /// True while the session holds uncommitted writes.
    pub fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.in_transaction())
    }

    /// Hand the session back to its pool.
    pub fn release(mut self) {
        self.reclaim();
    }

    fn conn(&mut self) -> Result<&mut Box<dyn ShardConnection>, SessionError> {
        let shard = self.pool.shard().clone();
        self.conn.as_mut().ok_or(SessionError::Closed(shard))
    }

    fn observe<T>(&mut self, result: Result<T, StorageError>) -> Result<T, SessionError> {
        if let Err(StorageError::ConnectionLost(_)) = &result {
            self.broken = true;
        }
        result.map_err(SessionError::from)
    }

    fn reclaim(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.reclaim(conn, self.broken);
            debug!(shard = %self.pool.shard(), "session released");
        }
        // Capacity is returned after the connection is parked so the next
        // waiter finds it idle.
        self.permit.take();
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.reclaim();
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("shard", self.pool.shard())
            .field("in_transaction", &self.in_transaction())
            .field("broken", &self.broken)
            .finish()
    }
}
