//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors that can occur while building or querying a ring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The ring holds zero positions (no shards configured).
    #[error("no shards in the ring")]
    EmptyRing,

    /// Ring configuration rejected at build time.
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),
}
