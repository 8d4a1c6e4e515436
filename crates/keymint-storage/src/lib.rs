//! URL repository over the sharded inventory stores.

pub mod sharded;

pub use sharded::ShardedUrlRepository;
