//! Command-line arguments and process setup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use router::ShardingConfig;

use crate::commands::Command;

/// Shards assumed when no configuration file is given.
const LOCAL_SHARDS: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "shard-router", version, about = "Consistent-hash shard router")]
pub struct CliConfig {
    /// Path to a JSON sharding configuration. Defaults to three in-memory
    /// shards named shard_1..shard_3.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Print results as compact single-line JSON.
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load the sharding configuration, run the command and print its result.
    pub fn run(self) -> Result<()> {
        setup_tracing(&self.log_level);

        let sharding = self.sharding()?;
        debug!(
            shards = sharding.shards.len(),
            virtual_node_count = sharding.ring.virtual_node_count,
            hash_algorithm = %sharding.ring.hash_algorithm,
            "configuration loaded"
        );

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let result = runtime.block_on(self.command.execute(&sharding))?;

        let out = if self.compact {
            serde_json::to_string(&result)?
        } else {
            serde_json::to_string_pretty(&result)?
        };
        println!("{out}");
        Ok(())
    }

    fn sharding(&self) -> Result<ShardingConfig> {
        match &self.config {
            Some(path) => {
                info!(path = %path.display(), "loading sharding configuration");
                ShardingConfig::from_file(path)
                    .with_context(|| format!("failed to load {}", path.display()))
            }
            None => Ok(ShardingConfig::local(LOCAL_SHARDS)),
        }
    }
}

fn setup_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
