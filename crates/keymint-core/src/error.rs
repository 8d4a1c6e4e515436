use thiserror::Error;

/// Type alias for the result type used across the keymint crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Centralized error taxonomy for the inventory core.
///
/// Errors propagate as tagged values through the pipeline result
/// channels; partial failures are recorded per shard and do not fail
/// sibling shards.
#[derive(Debug, Error)]
pub enum Error {
    /// No row matched, or no shard route covers the key.
    #[error("not found: {0}")]
    NotFound(String),
    /// The routed shard has no free inventory slot left.
    #[error("inventory exhausted in shard {0}")]
    Exhausted(String),
    /// A compare-and-swap update on `shard_status` lost the race.
    #[error("generation conflict for ({shard_id}, {shard_char})")]
    Conflict { shard_id: String, shard_char: String },
    /// An I/O deadline elapsed.
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// Malformed key range, size string or short key.
    #[error("invalid input: {0}")]
    Invalid(String),
    /// A store-level failure bubbled up from the embedded database.
    #[error("store failure: {0}")]
    Upstream(String),
}

impl Error {
    /// Returns true for errors that indicate a missing row or route.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true when a CAS update lost its generation race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}
