//! In-memory shard storage backend.
//!
//! Each [`MemoryShard`] is a set of keyed tables. Connections stage their
//! writes privately and publish them atomically on commit, so a rolled back
//! or discarded transaction leaves no trace. Primary keys are checked both
//! when a write is executed and again under the commit lock, which catches
//! two sessions racing to insert the same key.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::connection::{Connector, ShardConnection};
use crate::error::StorageError;
use crate::value::{Row, Statement, Value};

#[derive(Debug)]
struct Table {
    key_column: String,
    rows: BTreeMap<Value, Row>,
}

/// In-memory storage engine for one shard.
#[derive(Debug)]
pub struct MemoryShard {
    name: String,
    tables: DashMap<String, Table>,
    commit_lock: Mutex<()>,
    available: AtomicBool,
    commits: AtomicU64,
}

impl MemoryShard {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            tables: DashMap::new(),
            commit_lock: Mutex::new(()),
            available: AtomicBool::new(true),
            commits: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate an outage: while unavailable, connects and statements fail
    /// with [`StorageError::ConnectionLost`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Committed row for `key`, if any.
    pub fn committed_row(&self, table: &str, key: &Value) -> Option<Row> {
        self.tables.get(table).and_then(|t| t.rows.get(key).cloned())
    }

    /// Number of committed rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.rows.len())
    }

    /// Number of successful commits that published at least one write.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::ConnectionLost(format!("shard {} unavailable", self.name)))
        }
    }

    /// Checks a staged write against committed data.
    fn check_insert(&self, write: &StagedWrite) -> Result<(), StorageError> {
        let Some(table) = self.tables.get(&write.table) else {
            return Ok(());
        };
        if table.key_column != write.key_column {
            return Err(StorageError::InvalidStatement(format!(
                "table {} is keyed by {}, not {}",
                write.table, table.key_column, write.key_column
            )));
        }
        if table.rows.contains_key(&write.key) {
            return Err(StorageError::DuplicateKey {
                table: write.table.clone(),
                key: write.key.clone(),
            });
        }
        Ok(())
    }

    fn select_committed(&self, table: &str, key_column: &str, key: &Value) -> Vec<Row> {
        let Some(table) = self.tables.get(table) else {
            return Vec::new();
        };
        if table.key_column == key_column {
            table.rows.get(key).cloned().into_iter().collect()
        } else {
            table
                .rows
                .values()
                .filter(|row| row.get(key_column) == Some(key))
                .cloned()
                .collect()
        }
    }

    fn publish(&self, staged: &[StagedWrite]) -> Result<(), StorageError> {
        let _guard = self.commit_lock.lock();
        for write in staged {
            self.check_insert(write)?;
        }
        for write in staged {
            self.tables
                .entry(write.table.clone())
                .or_insert_with(|| Table {
                    key_column: write.key_column.clone(),
                    rows: BTreeMap::new(),
                })
                .rows
                .insert(write.key.clone(), write.row.clone());
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
struct StagedWrite {
    table: String,
    key_column: String,
    key: Value,
    row: Row,
}

/// Connection to a [`MemoryShard`].
pub struct MemoryConnection {
    shard: Arc<MemoryShard>,
    staged: Vec<StagedWrite>,
}

impl MemoryConnection {
    fn insert(&mut self, table: &str, key_column: &str, row: &Row) -> Result<Vec<Row>, StorageError> {
        let key = match row.get(key_column) {
            Some(Value::Null) | None => {
                return Err(StorageError::InvalidStatement(format!(
                    "insert into {table} has no value for key column {key_column}"
                )))
            }
            Some(key) => key.clone(),
        };
        let write = StagedWrite {
            table: table.to_owned(),
            key_column: key_column.to_owned(),
            key,
            row: row.clone(),
        };

        self.shard.check_insert(&write)?;
        if self
            .staged
            .iter()
            .any(|w| w.table == write.table && w.key == write.key)
        {
            return Err(StorageError::DuplicateKey {
                table: write.table,
                key: write.key,
            });
        }

        self.staged.push(write);
        Ok(vec![row.clone()])
    }

    fn staged_rows<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.staged
            .iter()
            .filter(move |w| w.table == table)
            .map(|w| &w.row)
    }
}

#[async_trait]
impl ShardConnection for MemoryConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        self.shard.check_available()?;
        match statement {
            Statement::Insert {
                table,
                key_column,
                row,
            } => self.insert(table, key_column, row),
            Statement::SelectByKey {
                table,
                key_column,
                key,
            } => {
                let mut rows = self.shard.select_committed(table, key_column, key);
                rows.extend(
                    self.staged_rows(table)
                        .filter(|row| row.get(key_column) == Some(key))
                        .cloned(),
                );
                Ok(rows)
            }
            Statement::SelectAll { table } => {
                let mut rows: Vec<Row> = self
                    .shard
                    .tables
                    .get(table)
                    .map(|t| t.rows.values().cloned().collect())
                    .unwrap_or_default();
                rows.extend(self.staged_rows(table).cloned());
                Ok(rows)
            }
        }
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        self.shard.check_available()?;
        if self.staged.is_empty() {
            return Ok(());
        }
        self.shard.publish(&self.staged)?;
        debug!(shard = %self.shard.name, writes = self.staged.len(), "committed transaction");
        self.staged.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.staged.is_empty() {
            debug!(shard = %self.shard.name, writes = self.staged.len(), "rolled back transaction");
        }
        self.staged.clear();
        Ok(())
    }

    fn discard(&mut self) {
        self.staged.clear();
    }

    fn in_transaction(&self) -> bool {
        !self.staged.is_empty()
    }
}

/// Opens connections to a shared [`MemoryShard`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    shard: Arc<MemoryShard>,
}

impl MemoryConnector {
    pub fn new(shard: Arc<MemoryShard>) -> Self {
        Self { shard }
    }

    pub fn shard(&self) -> &Arc<MemoryShard> {
        &self.shard
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn ShardConnection>, StorageError> {
        self.shard.check_available()?;
        Ok(Box::new(MemoryConnection {
            shard: Arc::clone(&self.shard),
            staged: Vec::new(),
        }))
    }

    fn describe(&self) -> String {
        format!("memory://{}", self.shard.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> Row {
        Row::new().with("user_id", id).with("name", name)
    }

    async fn connect(shard: &Arc<MemoryShard>) -> Box<dyn ShardConnection> {
        MemoryConnector::new(Arc::clone(shard)).connect().await.unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;

        let rows = conn
            .execute(&Statement::insert("users", "user_id", user(1, "ada")))
            .await
            .unwrap();
        assert_eq!(rows, vec![user(1, "ada")]);
        assert!(conn.in_transaction());
        assert_eq!(shard.row_count("users"), 0);

        conn.commit().await.unwrap();
        assert!(!conn.in_transaction());
        assert_eq!(shard.committed_row("users", &Value::Int(1)), Some(user(1, "ada")));
        assert_eq!(shard.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_and_discard_leave_nothing() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;

        conn.execute(&Statement::insert("users", "user_id", user(1, "ada")))
            .await
            .unwrap();
        conn.rollback().await.unwrap();
        conn.commit().await.unwrap();
        assert_eq!(shard.row_count("users"), 0);

        conn.execute(&Statement::insert("users", "user_id", user(2, "bob")))
            .await
            .unwrap();
        conn.discard();
        conn.commit().await.unwrap();
        assert_eq!(shard.row_count("users"), 0);
        assert_eq!(shard.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_key_on_execute() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;
        conn.execute(&Statement::insert("users", "user_id", user(1, "ada")))
            .await
            .unwrap();
        conn.commit().await.unwrap();

        let err = conn
            .execute(&Statement::insert("users", "user_id", user(1, "again")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::DuplicateKey { table: "users".into(), key: Value::Int(1) }
        );
    }

    #[tokio::test]
    async fn test_duplicate_key_on_racing_commit() {
        let shard = MemoryShard::new("s1");
        let mut a = connect(&shard).await;
        let mut b = connect(&shard).await;

        a.execute(&Statement::insert("users", "user_id", user(5, "a")))
            .await
            .unwrap();
        b.execute(&Statement::insert("users", "user_id", user(5, "b")))
            .await
            .unwrap();

        a.commit().await.unwrap();
        assert!(matches!(b.commit().await, Err(StorageError::DuplicateKey { .. })));
        b.rollback().await.unwrap();
        assert_eq!(shard.committed_row("users", &Value::Int(5)), Some(user(5, "a")));
    }

    #[tokio::test]
    async fn test_reads_see_own_staged_writes() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;
        let mut other = connect(&shard).await;
        conn.execute(&Statement::insert("users", "user_id", user(9, "ada")))
            .await
            .unwrap();

        let select = Statement::select_by_key("users", "user_id", 9i64);
        assert_eq!(conn.execute(&select).await.unwrap().len(), 1);
        assert!(other.execute(&select).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_select_by_secondary_column_and_all() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;
        for (id, name) in [(1, "ada"), (2, "bob"), (3, "ada")] {
            conn.execute(&Statement::insert("users", "user_id", user(id, name)))
                .await
                .unwrap();
        }
        conn.commit().await.unwrap();

        let by_name = conn
            .execute(&Statement::select_by_key("users", "name", "ada"))
            .await
            .unwrap();
        assert_eq!(by_name.len(), 2);
        assert_eq!(conn.execute(&Statement::select_all("users")).await.unwrap().len(), 3);
        assert!(conn.execute(&Statement::select_all("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_column_rejected() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;
        let err = conn
            .execute(&Statement::insert("users", "user_id", Row::new().with("name", "x")))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidStatement(_)));
    }

    #[tokio::test]
    async fn test_unavailable_shard() {
        let shard = MemoryShard::new("s1");
        let mut conn = connect(&shard).await;
        shard.set_available(false);

        let connector = MemoryConnector::new(Arc::clone(&shard));
        assert!(matches!(connector.connect().await, Err(StorageError::ConnectionLost(_))));
        assert!(matches!(
            conn.execute(&Statement::select_all("users")).await,
            Err(StorageError::ConnectionLost(_))
        ));
    }
}
