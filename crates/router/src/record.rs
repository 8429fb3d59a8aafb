//! Typed records and their row mapping.
//!
//! Every routed entity type names its table and key column and converts
//! itself to and from a [`Row`] field by field. The shard an entity lives on
//! is never stored; it is recomputed from the decimal/text form of the
//! primary key on every access.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use sessions::{Row, RowError, Value};

/// An entity that can be stored on a shard.
pub trait Record: Sized + Send + Sync {
    /// Table holding records of this type on every shard.
    const TABLE: &'static str;

    /// Primary key column.
    const KEY_COLUMN: &'static str;

    /// Primary key type. Its `Display` form is the routing key.
    type Key: Display + Clone + Into<Value> + Send + Sync;

    fn primary_key(&self) -> Self::Key;

    fn to_row(&self) -> Row;

    fn from_row(row: &Row) -> Result<Self, RowError>;

    /// String hashed onto the ring for `key`.
    fn routing_key(key: &Self::Key) -> String {
        key.to_string()
    }
}

/// A user account, sharded by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub region: String,
    pub email: String,
}

impl User {
    pub fn new(
        user_id: i64,
        name: impl Into<String>,
        region: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            region: region.into(),
            email: email.into(),
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const KEY_COLUMN: &'static str = "user_id";
    type Key = i64;

    fn primary_key(&self) -> i64 {
        self.user_id
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("user_id", self.user_id)
            .with("name", self.name.as_str())
            .with("region", self.region.as_str())
            .with("email", self.email.as_str())
    }

    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(Self {
            user_id: row.int("user_id")?,
            name: row.text("name")?.to_owned(),
            region: row.text("region")?.to_owned(),
            email: row.text("email")?.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_mapping_is_lossless() {
        let user = User::new(42, "Ada", "eu-west", "ada@example.com");
        assert_eq!(User::from_row(&user.to_row()).unwrap(), user);
    }

    #[test]
    fn test_routing_key_is_decimal() {
        assert_eq!(User::routing_key(&42), "42");
        assert_eq!(User::routing_key(&-7), "-7");
    }

    #[test]
    fn test_from_row_reports_missing_column() {
        let row = Row::new().with("user_id", 1i64).with("name", "x").with("region", "r");
        assert_eq!(User::from_row(&row), Err(RowError::MissingColumn("email".into())));
    }
}
