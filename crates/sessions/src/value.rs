//! Statements and rows exchanged with a shard's storage engine.
//!
//! Records are converted to and from [`Row`]s field by field at the storage
//! boundary; nothing above this layer sees untyped data.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::RowError;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Column name to value map for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn int(&self, column: &str) -> Result<i64, RowError> {
        match self.require(column)? {
            Value::Int(v) => Ok(*v),
            _ => Err(RowError::TypeMismatch {
                column: column.to_owned(),
                expected: "an integer",
            }),
        }
    }

    pub fn text(&self, column: &str) -> Result<&str, RowError> {
        match self.require(column)? {
            Value::Text(v) => Ok(v),
            _ => Err(RowError::TypeMismatch {
                column: column.to_owned(),
                expected: "text",
            }),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, column: &str) -> Result<&Value, RowError> {
        self.0
            .get(column)
            .ok_or_else(|| RowError::MissingColumn(column.to_owned()))
    }
}

/// A parameterized statement against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Insert `row`, keyed by its `key_column`; returns the stored row.
    Insert {
        table: String,
        key_column: String,
        row: Row,
    },
    /// Rows whose `key_column` equals `key`.
    SelectByKey {
        table: String,
        key_column: String,
        key: Value,
    },
    /// Every row of the table.
    SelectAll { table: String },
}

impl Statement {
    pub fn insert(table: impl Into<String>, key_column: impl Into<String>, row: Row) -> Self {
        Statement::Insert {
            table: table.into(),
            key_column: key_column.into(),
            row,
        }
    }

    pub fn select_by_key(
        table: impl Into<String>,
        key_column: impl Into<String>,
        key: impl Into<Value>,
    ) -> Self {
        Statement::SelectByKey {
            table: table.into(),
            key_column: key_column.into(),
            key: key.into(),
        }
    }

    pub fn select_all(table: impl Into<String>) -> Self {
        Statement::SelectAll { table: table.into() }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::Insert { table, .. }
            | Statement::SelectByKey { table, .. }
            | Statement::SelectAll { table } => table,
        }
    }

    /// True for statements that modify data.
    pub fn is_write(&self) -> bool {
        matches!(self, Statement::Insert { .. })
    }
}
