use crate::map_store_error;
use jiff::Timestamp;
use keymint_core::{Error, Result};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Integer offset the very first seeding run starts counting from.
pub const DEFAULT_SEED_START: u64 = 1_000_000_000;

const INSERT_QUERY: &str = r#"
INSERT INTO shard_status (shard_id, shard_char, start, "end", generation, status, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_QUERY: &str = r#"
SELECT shard_id, shard_char, start, "end", generation, status, created_at, updated_at
FROM shard_status
WHERE shard_id = ? AND shard_char = ?
"#;

const ADVANCE_QUERY: &str = r#"
UPDATE shard_status
SET "end" = ?, updated_at = ?, generation = generation + 1, status = ?
WHERE shard_id = ? AND shard_char = ? AND generation = ? AND status = ?
"#;

/// Lifecycle of one `(shard_id, shard_char)` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStatus {
    Processing,
    Processed,
    Failed,
}

impl SeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedStatus::Processing => "processing",
            SeedStatus::Processed => "processed",
            SeedStatus::Failed => "failed",
        }
    }
}

impl Display for SeedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeedStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "processing" => Ok(SeedStatus::Processing),
            "processed" => Ok(SeedStatus::Processed),
            "failed" => Ok(SeedStatus::Failed),
            other => Err(Error::Invalid(format!("unknown seed status '{other}'"))),
        }
    }
}

/// One row of the coordinator store: the generation-versioned counter
/// window for a single letter of a key range.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardStatus {
    pub shard_id: String,
    pub shard_char: String,
    pub start: i64,
    pub end: i64,
    pub generation: i64,
    pub status: SeedStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ShardStatus {
    /// The initial row for a letter: `generation = 1`, a window of
    /// `seed_size` keys, and `processing` until the first run lands.
    pub fn initial(shard_id: impl Into<String>, shard_char: char, start: u64, seed_size: u64) -> Self {
        let now = Timestamp::now();
        Self {
            shard_id: shard_id.into(),
            shard_char: shard_char.to_string(),
            start: start as i64,
            end: (start + seed_size) as i64,
            generation: 1,
            status: SeedStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository over the `shard_status` table in the coordinator store.
///
/// Updates are conditional on the current generation, which makes the
/// refill pipeline safe to run concurrently across shards and
/// at-most-once per `(shard_char, generation)`: a crashed run leaves
/// the row at its prior generation and the next run picks up from its
/// `end`.
#[derive(Debug, Clone)]
pub struct ShardStatusStore {
    pool: SqlitePool,
}

impl ShardStatusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the given rows in one transaction.
    pub async fn insert(&self, rows: &[ShardStatus]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_store_error)?;

        for row in rows {
            sqlx::query(INSERT_QUERY)
                .bind(&row.shard_id)
                .bind(&row.shard_char)
                .bind(row.start)
                .bind(row.end)
                .bind(row.generation)
                .bind(row.status.as_str())
                .bind(row.created_at.as_second())
                .bind(row.updated_at.as_second())
                .execute(&mut *tx)
                .await
                .map_err(map_store_error)?;
        }

        tx.commit().await.map_err(map_store_error)
    }

    /// Reads the last recorded state for `(shard_id, shard_char)`.
    pub async fn last_state(&self, shard_id: &str, shard_char: &str) -> Result<ShardStatus> {
        let row = sqlx::query(SELECT_QUERY)
            .bind(shard_id)
            .bind(shard_char)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| {
                Error::NotFound(format!("no shard status for ({shard_id}, {shard_char})"))
            })?;

        let status: String = row.try_get("status").map_err(map_store_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_store_error)?;
        let updated_at: i64 = row.try_get("updated_at").map_err(map_store_error)?;

        Ok(ShardStatus {
            shard_id: row.try_get("shard_id").map_err(map_store_error)?,
            shard_char: row.try_get("shard_char").map_err(map_store_error)?,
            start: row.try_get("start").map_err(map_store_error)?,
            end: row.try_get("end").map_err(map_store_error)?,
            generation: row.try_get("generation").map_err(map_store_error)?,
            status: status.parse()?,
            created_at: timestamp_from_seconds(created_at)?,
            updated_at: timestamp_from_seconds(updated_at)?,
        })
    }

    /// Compare-and-swap advance of a counter row.
    ///
    /// Sets the new window end and status and bumps the generation,
    /// conditional on the caller-observed generation and status. Zero
    /// rows affected means another run got there first; the caller
    /// re-reads and recomputes.
    pub async fn advance(
        &self,
        current: &ShardStatus,
        new_end: i64,
        new_status: SeedStatus,
    ) -> Result<()> {
        debug!(
            shard_id = %current.shard_id,
            shard_char = %current.shard_char,
            generation = current.generation,
            "advancing shard generation"
        );

        let result = sqlx::query(ADVANCE_QUERY)
            .bind(new_end)
            .bind(Timestamp::now().as_second())
            .bind(new_status.as_str())
            .bind(&current.shard_id)
            .bind(&current.shard_char)
            .bind(current.generation)
            .bind(current.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict {
                shard_id: current.shard_id.clone(),
                shard_char: current.shard_char.clone(),
            });
        }

        Ok(())
    }
}

fn timestamp_from_seconds(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|err| Error::Upstream(format!("invalid stored timestamp {seconds}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> ShardStatusStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(schema::CREATE_SHARD_STATUS_TABLE)
            .execute(&pool)
            .await
            .unwrap();
        ShardStatusStore::new(pool)
    }

    #[tokio::test]
    async fn insert_then_read_roundtrips() {
        let store = store().await;
        let row = ShardStatus::initial("a-e", 'a', 1_000_000_000, 1_000);
        store.insert(std::slice::from_ref(&row)).await.unwrap();

        let read = store.last_state("a-e", "a").await.unwrap();
        assert_eq!(read.start, 1_000_000_000);
        assert_eq!(read.end, 1_000_001_000);
        assert_eq!(read.generation, 1);
        assert_eq!(read.status, SeedStatus::Processing);
    }

    #[tokio::test]
    async fn missing_row_reports_not_found() {
        let store = store().await;
        assert!(store.last_state("a-e", "a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn duplicate_letter_rows_are_rejected() {
        let store = store().await;
        let row = ShardStatus::initial("a-e", 'a', 0, 10);
        store.insert(std::slice::from_ref(&row)).await.unwrap();
        assert!(store.insert(std::slice::from_ref(&row)).await.is_err());
    }

    #[tokio::test]
    async fn advance_bumps_generation_and_status() {
        let store = store().await;
        let row = ShardStatus::initial("a-e", 'b', 0, 500);
        store.insert(std::slice::from_ref(&row)).await.unwrap();

        let current = store.last_state("a-e", "b").await.unwrap();
        store
            .advance(&current, current.end, SeedStatus::Processed)
            .await
            .unwrap();

        let advanced = store.last_state("a-e", "b").await.unwrap();
        assert_eq!(advanced.generation, 2);
        assert_eq!(advanced.status, SeedStatus::Processed);
        assert_eq!(advanced.end, 500);
    }

    #[tokio::test]
    async fn advance_with_stale_generation_conflicts() {
        let store = store().await;
        let row = ShardStatus::initial("f-j", 'f', 0, 100);
        store.insert(std::slice::from_ref(&row)).await.unwrap();

        let snapshot = store.last_state("f-j", "f").await.unwrap();
        store
            .advance(&snapshot, snapshot.end, SeedStatus::Processed)
            .await
            .unwrap();

        // Second advance from the same snapshot has a stale generation.
        let err = store
            .advance(&snapshot, snapshot.end + 100, SeedStatus::Processed)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn concurrent_advances_produce_exactly_one_winner() {
        let store = store().await;
        let row = ShardStatus::initial("k-p", 'k', 0, 100);
        store.insert(std::slice::from_ref(&row)).await.unwrap();

        // Walk the row to generation 3 first.
        for _ in 0..2 {
            let cur = store.last_state("k-p", "k").await.unwrap();
            store
                .advance(&cur, cur.end + 100, SeedStatus::Processed)
                .await
                .unwrap();
        }

        let snapshot = store.last_state("k-p", "k").await.unwrap();
        assert_eq!(snapshot.generation, 3);

        let (left, right) = tokio::join!(
            store.advance(&snapshot, snapshot.end + 100, SeedStatus::Processed),
            store.advance(&snapshot, snapshot.end + 100, SeedStatus::Processed),
        );

        let winners = [&left, &right].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&left, &right]
            .iter()
            .filter(|r| matches!(r, Err(Error::Conflict { .. })))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 1);

        let after = store.last_state("k-p", "k").await.unwrap();
        assert_eq!(after.generation, 4);
    }

    #[tokio::test]
    async fn advance_with_wrong_expected_status_conflicts() {
        let store = store().await;
        let row = ShardStatus::initial("q-u", 'q', 0, 50);
        store.insert(std::slice::from_ref(&row)).await.unwrap();

        let mut stale = store.last_state("q-u", "q").await.unwrap();
        stale.status = SeedStatus::Processed; // row is actually `processing`

        let err = store
            .advance(&stale, stale.end, SeedStatus::Processed)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn status_parses_its_display_form() {
        for status in [SeedStatus::Processing, SeedStatus::Processed, SeedStatus::Failed] {
            assert_eq!(status.as_str().parse::<SeedStatus>().unwrap(), status);
        }
        assert!("done".parse::<SeedStatus>().is_err());
    }
}
