use crate::map_store_error;
use keymint_core::Result;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Counts rows still waiting for a URL.
///
/// Deliberately does not exclude soft-deleted rows: the count is a
/// wire-compatible inventory signal, and deleted slots have always
/// counted as free.
pub const URL_KEYS_PROBER_QUERY: &str =
    "SELECT COUNT(1) AS empty_records FROM urls WHERE url IS NULL";

/// Inventory stats for one shard store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeStats {
    pub shard_key: String,
    pub empty_records: i64,
}

/// Runs a single-value stats query against one shard store.
#[derive(Debug, Clone)]
pub struct Prober {
    name: String,
    query: String,
    pool: SqlitePool,
}

impl Prober {
    pub fn new(name: impl Into<String>, pool: SqlitePool, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            pool,
        }
    }

    /// Executes the query and reads the first column of the first row
    /// as the stat value.
    pub async fn stats(&self) -> Result<ProbeStats> {
        let row = sqlx::query(&self.query)
            .fetch_one(&self.pool)
            .await
            .map_err(map_store_error)?;

        let empty_records: i64 = row.try_get(0).map_err(map_store_error)?;

        Ok(ProbeStats {
            shard_key: self.name.clone(),
            empty_records,
        })
    }
}
