//! Bulk population of the short-key inventory.
//!
//! Two pipelines share the same structure: `seed` populates freshly
//! bootstrapped shards, `refill` tops up shards that have run low on
//! free slots. Both fan out one task per key range, stream keys out of
//! the batch generator, and record per-letter progress in the
//! coordinator store.

mod fill;
pub mod refill;
pub mod seed;
pub mod starts;

pub use refill::{refill, refill_with_threshold, FILL_THRESHOLD};
pub use seed::seed;
pub use starts::SeedStarts;

use keymint_core::{KeyRange, Result};

/// Outcome of one range's slice of a pipeline run.
pub(crate) struct RangeRun {
    pub range: KeyRange,
    pub letters: Vec<char>,
    pub skipped: bool,
    pub result: Result<()>,
}
