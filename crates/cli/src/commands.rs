//! Subcommands and their JSON-serializable results.

use std::collections::BTreeMap;

use anyhow::{ensure, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use tracing::info;

use corelib::{ShardId, Topology};
use router::{EntityRouter, Record, RouterError, ShardingConfig, User};
use sessions::PoolStatus;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the ring layout and each shard's share of the hash space.
    Inspect,

    /// Resolve keys to their owning shards.
    Route {
        /// Routing keys, e.g. decimal user ids.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Route keys "0".."N" and count hits per shard.
    Distribution {
        #[arg(short = 'n', long, default_value = "10000")]
        samples: usize,
    },

    /// Create one user on its owning shard.
    Create {
        user_id: i64,
        name: String,
        #[arg(long, default_value = "local")]
        region: String,
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Fetch one user from its owning shard.
    Get {
        user_id: i64,
        /// Create users 1..=N first. In-memory shards start out empty.
        #[arg(long, default_value = "0")]
        seed: i64,
    },

    /// Create users 1..=N on in-memory shards and read each back.
    Demo {
        #[arg(short = 'n', long, default_value = "100")]
        count: i64,
    },
}

#[derive(Debug, Serialize)]
pub struct Placement {
    pub key: String,
    pub shard: ShardId,
}

#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandResult {
    Inspect {
        hash_algorithm: String,
        virtual_node_count: usize,
        shards: Vec<ShardId>,
        tokens: usize,
        collisions: usize,
        ownership: BTreeMap<ShardId, f64>,
    },
    Route {
        placements: Vec<Placement>,
    },
    Distribution {
        samples: usize,
        counts: BTreeMap<ShardId, usize>,
    },
    Create {
        shard: ShardId,
        user: User,
    },
    Get {
        shard: ShardId,
        user: User,
    },
    Demo {
        created: usize,
        verified: usize,
        rows_per_shard: BTreeMap<ShardId, usize>,
        pools: BTreeMap<ShardId, PoolStatus>,
        missing_lookup: String,
    },
}

impl Command {
    pub async fn execute(&self, config: &ShardingConfig) -> Result<CommandResult> {
        match self {
            Command::Inspect => inspect(config),
            Command::Route { keys } => route(config, keys),
            Command::Distribution { samples } => distribution(config, *samples),
            Command::Create {
                user_id,
                name,
                region,
                email,
            } => {
                let user = User::new(*user_id, name.as_str(), region.as_str(), email.as_str());
                create(config, user).await
            }
            Command::Get { user_id, seed } => get(config, *user_id, *seed).await,
            Command::Demo { count } => demo(config, *count).await,
        }
    }
}

fn inspect(config: &ShardingConfig) -> Result<CommandResult> {
    let ring = config.ring.build_ring(config.shard_ids().cloned())?;
    Ok(CommandResult::Inspect {
        hash_algorithm: ring.partitioner_name().to_string(),
        virtual_node_count: ring.vnodes_per_shard(),
        shards: ring.shards().to_vec(),
        tokens: ring.token_count(),
        collisions: ring.collisions(),
        ownership: ring.ownership(),
    })
}

fn route(config: &ShardingConfig, keys: &[String]) -> Result<CommandResult> {
    let ring = config.ring.build_ring(config.shard_ids().cloned())?;
    let placements = keys
        .iter()
        .map(|key| {
            let shard = ring.get_node(key)?.clone();
            Ok(Placement {
                key: key.clone(),
                shard,
            })
        })
        .collect::<Result<Vec<_>, corelib::RingError>>()?;
    Ok(CommandResult::Route { placements })
}

fn distribution(config: &ShardingConfig, samples: usize) -> Result<CommandResult> {
    let ring = config.ring.build_ring(config.shard_ids().cloned())?;
    let keys: Vec<String> = (0..samples).map(|i| i.to_string()).collect();
    let counts = Topology::sample(&ring, keys.iter().map(String::as_str));
    Ok(CommandResult::Distribution { samples, counts })
}

fn seed_user(id: i64) -> User {
    User::new(id, format!("user-{id}"), "local", format!("user{id}@example.com"))
}

fn memory_router(config: &ShardingConfig) -> Result<EntityRouter> {
    let (router, _) =
        EntityRouter::in_memory(config).context("only memory:// shard addresses are served")?;
    Ok(router)
}

async fn create(config: &ShardingConfig, user: User) -> Result<CommandResult> {
    let router = memory_router(config)?;
    let shard = router.shard_for(&User::routing_key(&user.user_id))?.clone();
    let user = router.create(&user).await?;
    Ok(CommandResult::Create { shard, user })
}

async fn get(config: &ShardingConfig, user_id: i64, seed: i64) -> Result<CommandResult> {
    let router = memory_router(config)?;
    for id in 1..=seed {
        router.create(&seed_user(id)).await?;
    }
    let shard = router.shard_for(&User::routing_key(&user_id))?.clone();
    let user = router.get::<User>(&user_id).await?;
    Ok(CommandResult::Get { shard, user })
}

async fn demo(config: &ShardingConfig, count: i64) -> Result<CommandResult> {
    ensure!(count >= 0, "count must not be negative");
    let (router, backends) =
        EntityRouter::in_memory(config).context("only memory:// shard addresses are served")?;

    let mut created = 0;
    for id in 1..=count {
        router.create(&seed_user(id)).await?;
        created += 1;
    }

    let mut verified = 0;
    for id in 1..=count {
        let user: User = router.get(&id).await?;
        ensure!(user.user_id == id, "read back user {} for key {id}", user.user_id);
        verified += 1;
    }

    let missing = count + 1;
    let missing_lookup = match router.get::<User>(&missing).await {
        Err(err @ RouterError::NotFound { .. }) => err.to_string(),
        Err(err) => return Err(err.into()),
        Ok(_) => format!("user {missing} unexpectedly present"),
    };

    let rows_per_shard = backends
        .iter()
        .map(|(shard, backend)| (shard.clone(), backend.row_count(User::TABLE)))
        .collect();
    let pools = router
        .sessions()
        .shards()
        .filter_map(|shard| Some((shard.clone(), router.sessions().status(shard)?)))
        .collect();
    router.sessions().close();

    info!(created, verified, "demo finished");
    Ok(CommandResult::Demo {
        created,
        verified,
        rows_per_shard,
        pools,
        missing_lookup,
    })
}
