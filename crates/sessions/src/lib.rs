//! Per-shard session pools.
//!
//! This crate lends scoped sessions against individual shards:
//! - A storage-agnostic connection contract (`ShardConnection`, `Connector`)
//! - Typed statements and rows crossing that boundary
//! - One bounded pool per configured shard, with bounded-wait acquisition
//! - Session handles that are released exactly once on every exit path
//! - An in-memory transactional engine used as the reference backend

pub mod connection;
pub mod error;
pub mod factory;
pub mod memory;
pub mod pool;
pub mod session;
pub mod value;

pub use connection::{Connector, ShardConnection};
pub use error::{RowError, SessionError, StorageError};
pub use factory::ShardSessionFactory;
pub use memory::{MemoryConnector, MemoryShard};
pub use pool::{PoolConfig, PoolStatus};
pub use session::SessionHandle;
pub use value::{Row, Statement, Value};
