//! Error types for session acquisition and shard storage.

use std::time::Duration;

use corelib::ShardId;

use crate::value::Value;

/// Errors reported by a shard's storage engine through a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The write collides with an existing primary key.
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey {
        /// Table the write targeted.
        table: String,
        /// Conflicting primary key value.
        key: Value,
    },

    /// The engine cannot execute the statement as given.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// The connection is unusable; it will not be returned to the pool.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

/// Errors decoding a typed record from a row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing column {0}")]
    MissingColumn(String),

    #[error("column {column} is not {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
    },
}

/// Errors from opening or using a shard session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No pool is configured for this shard.
    #[error("unknown shard: {0}")]
    UnknownShard(ShardId),

    /// Every session of the shard's pool stayed checked out for the whole
    /// acquisition window.
    #[error("no session available for shard {shard} within {waited:?}")]
    PoolExhausted { shard: ShardId, waited: Duration },

    /// The pool was shut down.
    #[error("session pool for shard {0} is closed")]
    Closed(ShardId),

    /// A new connection could not be established.
    #[error("failed to connect to shard {shard}: {source}")]
    Connect {
        shard: ShardId,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
