//! Shard identifiers.
//!
//! A shard is one independently-storing partition of the key space. The ring
//! only ever hands out the identifiers it was built with.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque identifier naming one physical partition.
///
/// Backed by an `Arc<str>` so clones handed out by the ring on every lookup
/// do not allocate.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardId(Arc<str>);

impl ShardId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardId({})", &self.0)
    }
}

impl From<&str> for ShardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ShardId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Serialize for ShardId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ShardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ShardId::from)
    }
}

impl AsRef<str> for ShardId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_raw_id() {
        assert_eq!(ShardId::new("shard_1").to_string(), "shard_1");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id: ShardId = serde_json::from_str("\"shard_3\"").unwrap();
        assert_eq!(id.as_str(), "shard_3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"shard_3\"");
    }

    #[test]
    fn test_equality_across_constructors() {
        assert_eq!(ShardId::from("a"), ShardId::from(String::from("a")));
    }
}
