//! Tests for the primary/replica split.

use std::sync::Arc;

use router::{ReadWriteSplit, Record, RouterError, User};
use sessions::{PoolConfig, ShardSessionFactory, Statement};

fn split() -> (ReadWriteSplit, Arc<ShardSessionFactory>) {
    let (sessions, _) = ShardSessionFactory::in_memory(["primary", "replica"], PoolConfig::default());
    let sessions = Arc::new(sessions);
    let split = ReadWriteSplit::new(Arc::clone(&sessions), "primary", "replica").unwrap();
    (split, sessions)
}

async fn seed_replica(sessions: &ShardSessionFactory, user: &User) {
    let mut session = sessions.open(&"replica".into()).await.unwrap();
    session
        .execute(&Statement::insert(User::TABLE, User::KEY_COLUMN, user.to_row()))
        .await
        .unwrap();
    session.commit().await.unwrap();
    session.release();
}

#[tokio::test]
async fn test_writes_go_to_primary_reads_to_replica() {
    let (split, sessions) = split();
    let ada = User::new(1, "Ada", "eu", "ada@example.com");

    split.create(&ada).await.unwrap();
    // Nothing replicates in memory, so the replica has not seen the write.
    assert!(split.get::<User>(&1).await.unwrap_err().is_not_found());

    seed_replica(&sessions, &ada).await;
    assert_eq!(split.get::<User>(&1).await.unwrap(), ada);
    assert_eq!(split.list::<User>().await.unwrap(), vec![ada]);
}

#[tokio::test]
async fn test_primary_write_failure_rolls_back() {
    let (split, _) = split();
    let ada = User::new(1, "Ada", "eu", "ada@example.com");
    split.create(&ada).await.unwrap();

    let err = split.create(&ada).await.unwrap_err();
    assert!(matches!(err, RouterError::CreateFailed { ref shard, .. } if shard.as_str() == "primary"));
}

#[test]
fn test_requires_registered_shards() {
    let (sessions, _) = ShardSessionFactory::in_memory(["primary"], PoolConfig::default());
    let err = ReadWriteSplit::new(Arc::new(sessions), "primary", "replica").unwrap_err();
    assert!(matches!(err, RouterError::UnknownShard(ref s) if s.as_str() == "replica"));
}
