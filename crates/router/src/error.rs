//! Error types for routing and configuration.

use std::path::PathBuf;
use std::time::Duration;

use corelib::{RingError, ShardId};
use sessions::{RowError, SessionError};

/// Errors loading or validating the sharding configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unsupported connection address {address} for shard {shard}")]
    UnsupportedAddress { shard: ShardId, address: String },
}

/// Errors surfaced by routed entity operations.
///
/// Nothing is retried internally; every variant reached after routing names
/// the shard it happened on.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// No shards configured.
    #[error("no shards in the ring")]
    EmptyRing,

    /// The ring resolved a shard with no session pool.
    #[error("unknown shard: {0}")]
    UnknownShard(ShardId),

    #[error("{table} {key} not found on shard {shard}")]
    NotFound {
        shard: ShardId,
        table: &'static str,
        key: String,
    },

    /// Persistence rejected the write; the transaction was rolled back.
    #[error("create on shard {shard} failed: {cause}")]
    CreateFailed {
        shard: ShardId,
        #[source]
        cause: SessionError,
    },

    #[error("no session available for shard {shard} within {waited:?}")]
    PoolExhausted { shard: ShardId, waited: Duration },

    #[error("read from shard {shard} failed: {cause}")]
    ReadFailed {
        shard: ShardId,
        #[source]
        cause: SessionError,
    },

    #[error("shard {shard} returned an undecodable row: {cause}")]
    Decode {
        shard: ShardId,
        #[source]
        cause: RowError,
    },

    /// Session could not be opened for a reason other than capacity.
    #[error("session on shard {shard} unavailable: {cause}")]
    Session {
        shard: ShardId,
        #[source]
        cause: SessionError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RouterError {
    /// Map a failure to open a session on `shard`.
    pub(crate) fn from_open(shard: &ShardId, err: SessionError) -> Self {
        match err {
            SessionError::UnknownShard(shard) => RouterError::UnknownShard(shard),
            SessionError::PoolExhausted { shard, waited } => {
                RouterError::PoolExhausted { shard, waited }
            }
            cause => RouterError::Session {
                shard: shard.clone(),
                cause,
            },
        }
    }

    /// Shard the error is attributed to, if any.
    pub fn shard(&self) -> Option<&ShardId> {
        match self {
            RouterError::UnknownShard(shard)
            | RouterError::NotFound { shard, .. }
            | RouterError::CreateFailed { shard, .. }
            | RouterError::PoolExhausted { shard, .. }
            | RouterError::ReadFailed { shard, .. }
            | RouterError::Decode { shard, .. }
            | RouterError::Session { shard, .. } => Some(shard),
            RouterError::EmptyRing | RouterError::Config(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterError::NotFound { .. })
    }
}

impl From<RingError> for RouterError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::EmptyRing => RouterError::EmptyRing,
            RingError::InvalidConfig(msg) => RouterError::Config(ConfigError::Invalid(msg)),
        }
    }
}
