//! Command-line front end for the shard router.
//!
//! Provides commands for:
//! - Inspecting ring layout and hash-space ownership
//! - Resolving keys to shards
//! - Sampling key distribution
//! - Running create/get round trips against in-memory shards

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
