//! Core types for the keymint short-key inventory.
//!
//! This crate provides the shared vocabulary used by the generator, the
//! shard coordinator, the URL repository and the seeding pipelines:
//! short keys, URL records, the canonical alphabet catalog, key ranges
//! and the error taxonomy.

pub mod catalog;
pub mod error;
pub mod key_range;
pub mod record;
pub mod short_key;
pub mod size;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use key_range::KeyRange;
pub use record::UrlRecord;
pub use short_key::ShortKey;
pub use size::parse_size;
