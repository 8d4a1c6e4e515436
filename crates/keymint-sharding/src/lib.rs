//! Shard plumbing for the short-key inventory.
//!
//! One embedded SQLite store per key range, a coordinator that owns the
//! store handles, pluggable key→shard routing policies, and a separate
//! coordinator store tracking per-letter generation counters.

pub mod coordinator;
pub mod policy;
pub mod probe;
pub mod schema;
pub mod shard;
pub mod status;

pub use coordinator::{OpenMode, ShardCoordinator};
pub use policy::{HashPolicy, PrefixPolicy, RoundRobinPolicy, RoutingPolicy};
pub use probe::{ProbeStats, Prober, URL_KEYS_PROBER_QUERY};
pub use shard::Shard;
pub use status::{SeedStatus, ShardStatus, ShardStatusStore, DEFAULT_SEED_START};

use keymint_core::Error;

/// Maps driver-level failures onto the shared error taxonomy.
pub fn map_store_error(err: sqlx::Error) -> Error {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => Error::Timeout(message),
        sqlx::Error::RowNotFound => Error::NotFound(message),
        _ => Error::Upstream(message),
    }
}
