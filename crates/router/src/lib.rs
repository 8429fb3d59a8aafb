//! Entity routing across consistent-hashed shards.
//!
//! Composes the ring from `corelib` with the session pools from `sessions`:
//! - Static sharding configuration (shards, pools, virtual nodes, hash)
//! - Typed records with explicit row (de)serialization
//! - `EntityRouter`: create/get routed by primary key
//! - `ReadWriteSplit`: writes to a primary, reads from a replica

pub mod config;
pub mod error;
pub mod record;
pub mod router;
pub mod split;

pub use config::{Credentials, ShardConfig, ShardingConfig};
pub use error::{ConfigError, RouterError};
pub use record::{Record, User};
pub use router::EntityRouter;
pub use split::ReadWriteSplit;
