//! Core library for consistent-hash shard routing.
//!
//! This crate provides the fundamental abstractions for routing keys to shards:
//! - Token type for positions in the 128-bit hash space
//! - Partitioner algorithms (pinned, restart-stable digests)
//! - Shard identifiers and virtual nodes
//! - The immutable hash ring and its builder
//! - Ownership reporting over a built ring

pub mod config;
pub mod error;
pub mod partitioner;
pub mod ring;
pub mod shard;
pub mod token;
pub mod topology;
pub mod vnode;

pub use config::RingConfig;
pub use error::{RingError, Result};
pub use partitioner::{HashAlgorithm, Partitioner};
pub use ring::{HashRing, Ring, RingBuilder};
pub use shard::ShardId;
pub use token::{HashToken, Token};
pub use topology::Topology;
pub use vnode::VirtualNode;
