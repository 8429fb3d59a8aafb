//! Storage-agnostic connection contract.
//!
//! Any backing store that can execute a [`Statement`] inside a transaction
//! and commit or roll it back can serve a shard.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::value::{Row, Statement};

/// One open connection to a shard's storage engine.
///
/// Writes executed on a connection are part of an implicit transaction that
/// stays open until [`commit`](Self::commit) or [`rollback`](Self::rollback).
#[async_trait]
pub trait ShardConnection: Send {
    /// Execute a statement, returning the affected or selected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError>;

    /// Make the open transaction durable.
    async fn commit(&mut self) -> Result<(), StorageError>;

    /// Abandon the open transaction.
    async fn rollback(&mut self) -> Result<(), StorageError>;

    /// Synchronously abandon any open transaction.
    ///
    /// Called when a session is dropped without an explicit commit or
    /// rollback, where awaiting is not possible.
    fn discard(&mut self);

    /// True while uncommitted writes are pending.
    fn in_transaction(&self) -> bool;
}

/// Opens new connections for one shard.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ShardConnection>, StorageError>;

    /// Connection descriptor for logs. Must not contain credentials.
    fn describe(&self) -> String;
}
