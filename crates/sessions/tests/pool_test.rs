//! Tests for per-shard pools and session handles.
//!
//! # Test Strategy
//!
//! 1. **Acquisition**: unknown shards, lazy connects, reuse after release
//! 2. **Exhaustion**: bounded wait and fail-fast both return `PoolExhausted`
//! 3. **Release discipline**: drop, cancellation and broken connections

use std::sync::Arc;
use std::time::Duration;

use corelib::ShardId;
use sessions::{
    MemoryConnector, MemoryShard, PoolConfig, Row, SessionError, ShardSessionFactory, Statement,
    Value,
};

fn pool(max_size: usize, acquire_timeout_ms: u64) -> PoolConfig {
    PoolConfig {
        max_size,
        acquire_timeout_ms,
        fail_fast: false,
    }
}

fn insert_user(id: i64) -> Statement {
    Statement::insert("users", "user_id", Row::new().with("user_id", id).with("name", "n"))
}

// ============================================================================
// Acquisition
// ============================================================================

#[tokio::test]
async fn test_unknown_shard() {
    let (factory, _) = ShardSessionFactory::in_memory(["shard_1"], PoolConfig::default());
    let err = factory.open(&ShardId::new("shard_9")).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownShard(ref s) if s.as_str() == "shard_9"));
}

#[tokio::test]
async fn test_session_scoped_to_shard() {
    let (factory, _) = ShardSessionFactory::in_memory(["shard_1", "shard_2"], PoolConfig::default());
    let session = factory.open(&ShardId::new("shard_2")).await.unwrap();
    assert_eq!(session.shard().as_str(), "shard_2");
}

#[tokio::test]
async fn test_connections_are_reused_after_release() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(4, 100));

    for _ in 0..10 {
        let session = factory.open(&shard).await.unwrap();
        session.release();
    }

    let status = factory.status(&shard).unwrap();
    assert_eq!(status.open, 1);
    assert_eq!(status.idle, 1);
    assert_eq!(status.in_use, 0);
}

#[tokio::test]
async fn test_status_tracks_checked_out_sessions() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(3, 100));

    let a = factory.open(&shard).await.unwrap();
    let b = factory.open(&shard).await.unwrap();
    let status = factory.status(&shard).unwrap();
    assert_eq!((status.open, status.idle, status.in_use), (2, 0, 2));

    drop(a);
    b.release();
    let status = factory.status(&shard).unwrap();
    assert_eq!((status.open, status.idle, status.in_use), (2, 2, 0));
}

// ============================================================================
// Exhaustion
// ============================================================================

#[tokio::test]
async fn test_pool_exhausted_after_timeout() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(2, 50));

    let _a = factory.open(&shard).await.unwrap();
    let _b = factory.open(&shard).await.unwrap();

    let started = std::time::Instant::now();
    let err = factory.open(&shard).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::PoolExhausted { ref shard, waited } if shard.as_str() == "shard_1"
            && waited == Duration::from_millis(50)
    ));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_fail_fast_does_not_wait() {
    let shard = ShardId::new("shard_1");
    let config = PoolConfig {
        max_size: 1,
        acquire_timeout_ms: 60_000,
        fail_fast: true,
    };
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], config);

    let _held = factory.open(&shard).await.unwrap();
    let err = tokio::time::timeout(Duration::from_secs(1), factory.open(&shard))
        .await
        .expect("fail-fast acquisition must not block")
        .unwrap_err();
    assert!(matches!(err, SessionError::PoolExhausted { waited, .. } if waited.is_zero()));
}

#[tokio::test]
async fn test_waiter_gets_session_released_in_time() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 2_000));
    let factory = Arc::new(factory);

    let held = factory.open(&shard).await.unwrap();
    let waiter = {
        let factory = Arc::clone(&factory);
        let shard = shard.clone();
        tokio::spawn(async move { factory.open(&shard).await.map(|s| s.release()) })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    held.release();
    waiter.await.unwrap().unwrap();
    assert_eq!(factory.status(&shard).unwrap().open, 1);
}

// ============================================================================
// Release discipline
// ============================================================================

#[tokio::test]
async fn test_drop_rolls_back_open_transaction() {
    let shard = ShardId::new("shard_1");
    let (factory, backends) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 100));

    {
        let mut session = factory.open(&shard).await.unwrap();
        session.execute(&insert_user(1)).await.unwrap();
        assert!(session.in_transaction());
    }

    assert_eq!(backends[&shard].row_count("users"), 0);

    // The reused connection carries no leftover writes.
    let mut session = factory.open(&shard).await.unwrap();
    assert!(!session.in_transaction());
    session.commit().await.unwrap();
    assert_eq!(backends[&shard].row_count("users"), 0);
}

#[tokio::test]
async fn test_commit_then_release() {
    let shard = ShardId::new("shard_1");
    let (factory, backends) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 100));

    let mut session = factory.open(&shard).await.unwrap();
    session.execute(&insert_user(7)).await.unwrap();
    session.commit().await.unwrap();
    session.release();

    assert!(backends[&shard]
        .committed_row("users", &Value::Int(7))
        .is_some());
}

#[tokio::test]
async fn test_cancelled_caller_releases_session() {
    let shard = ShardId::new("shard_1");
    let (factory, backends) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 100));
    let factory = Arc::new(factory);

    let task = {
        let factory = Arc::clone(&factory);
        let shard = shard.clone();
        tokio::spawn(async move {
            let mut session = factory.open(&shard).await.unwrap();
            session.execute(&insert_user(3)).await.unwrap();
            // Never commits; cancelled while parked here.
            tokio::time::sleep(Duration::from_secs(60)).await;
            session.commit().await.unwrap();
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(backends[&shard].row_count("users"), 0);
    let session = factory.open(&shard).await.unwrap();
    assert!(!session.in_transaction());
}

#[tokio::test]
async fn test_connect_failure_frees_capacity() {
    let shard = ShardId::new("shard_1");
    let backend = MemoryShard::new("shard_1");
    let mut factory = ShardSessionFactory::new();
    factory.register(
        shard.clone(),
        pool(1, 50),
        Arc::new(MemoryConnector::new(Arc::clone(&backend))),
    );

    backend.set_available(false);
    let err = factory.open(&shard).await.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }));

    backend.set_available(true);
    factory.open(&shard).await.unwrap().release();
}

#[tokio::test]
async fn test_broken_connection_is_not_reused() {
    let shard = ShardId::new("shard_1");
    let (factory, backends) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 50));

    let mut session = factory.open(&shard).await.unwrap();
    backends[&shard].set_available(false);
    assert!(session.execute(&insert_user(1)).await.is_err());
    session.release();

    let status = factory.status(&shard).unwrap();
    assert_eq!((status.open, status.idle), (0, 0));

    backends[&shard].set_available(true);
    factory.open(&shard).await.unwrap().release();
    assert_eq!(factory.status(&shard).unwrap().open, 1);
}

#[tokio::test]
async fn test_closed_factory_rejects_open() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(1, 50));
    factory.open(&shard).await.unwrap().release();

    factory.close();
    let err = factory.open(&shard).await.unwrap_err();
    assert!(matches!(err, SessionError::Closed(_)));
    assert_eq!(factory.status(&shard).unwrap().open, 0);
}

#[tokio::test]
async fn test_release_after_close_closes_connection() {
    let shard = ShardId::new("shard_1");
    let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(2, 50));
    let held = factory.open(&shard).await.unwrap();

    factory.close();
    held.release();

    let status = factory.status(&shard).unwrap();
    assert_eq!((status.open, status.idle), (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_racing_releases_leaves_nothing_open() {
    for _ in 0..50 {
        let shard = ShardId::new("shard_1");
        let (factory, _) = ShardSessionFactory::in_memory([shard.clone()], pool(8, 50));
        let factory = Arc::new(factory);

        let mut held = Vec::new();
        for _ in 0..8 {
            held.push(factory.open(&shard).await.unwrap());
        }
        let releases: Vec<_> = held
            .into_iter()
            .map(|session| tokio::spawn(async move { session.release() }))
            .collect();
        factory.close();
        for release in releases {
            release.await.unwrap();
        }

        let status = factory.status(&shard).unwrap();
        assert_eq!((status.open, status.idle), (0, 0));
    }
}
