use jiff::Timestamp;
use keymint_core::{Error, Result, ShortKey, UrlRecord};
use keymint_sharding::{map_store_error, Shard, ShardCoordinator};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const FIND_BY_SHORT_KEY: &str = r#"
SELECT url, short_key, malicious, generation, created_at, updated_at, deleted_at
FROM urls
WHERE short_key = ? AND malicious = 0 AND deleted_at IS NULL
"#;

const DELETE_ENTRY: &str = "UPDATE urls SET deleted_at = ? WHERE short_key = ?";

const NEXT_FREE_SLOT: &str = r#"
SELECT short_key, generation, created_at
FROM urls
WHERE url IS NULL AND deleted_at IS NULL
LIMIT 1
"#;

const CLAIM_SLOT: &str = "UPDATE urls SET url = ?, malicious = 0, updated_at = ? WHERE short_key = ?";

const INSERT_COLUMNS: &str =
    "INSERT INTO urls (url, short_key, malicious, created_at, updated_at) VALUES ";

/// Deadline for one shard's slice of a batched insert.
const BATCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Batched, routed access to the URL rows across every shard store.
///
/// The repository is policy-agnostic: install a prefix policy on the
/// coordinator for reads, a round-robin policy for the write path.
/// There is no atomicity across shards — a failed batch on one shard
/// does not roll back commits that already landed on its siblings.
#[derive(Debug, Clone)]
pub struct ShardedUrlRepository {
    coordinator: Arc<ShardCoordinator>,
}

impl ShardedUrlRepository {
    pub fn new(coordinator: Arc<ShardCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Looks up an assigned, unflagged, live record by its short key.
    pub async fn find(&self, short_key: &str) -> Result<UrlRecord> {
        let key = ShortKey::parse(short_key)?;
        let shard = self.coordinator.get_shard(key.as_str())?;

        let row = sqlx::query(FIND_BY_SHORT_KEY)
            .bind(key.as_str())
            .fetch_optional(shard.pool())
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::NotFound(format!("no url for short key '{key}'")))?;

        record_from_row(&row)
    }

    /// Soft-deletes the record by stamping `deleted_at`. The row stays
    /// in the store; reads stop returning it.
    pub async fn delete(&self, short_key: &str) -> Result<bool> {
        let key = ShortKey::parse(short_key)?;
        let shard = self.coordinator.get_shard(key.as_str())?;

        debug!(short_key = %key, shard = shard.id(), "soft-deleting entry");

        let result = sqlx::query(DELETE_ENTRY)
            .bind(Timestamp::now().as_second())
            .bind(key.as_str())
            .execute(shard.pool())
            .await
            .map_err(map_store_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts the records grouped by their routed shard, one
    /// multi-row transactional insert per shard, executed in parallel.
    ///
    /// Any shard's failure surfaces as the overall error; commits that
    /// already completed on other shards stay.
    pub async fn create_batches(&self, records: Vec<UrlRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<String, (Shard, Vec<UrlRecord>)> = HashMap::new();
        for record in records {
            let shard = self.coordinator.get_shard(record.short_key.as_str())?;
            groups
                .entry(shard.id().to_string())
                .or_insert_with(|| (shard, Vec::new()))
                .1
                .push(record);
        }

        let (tx, mut rx) = mpsc::channel(groups.len());
        let group_count = groups.len();

        for (_, (shard, group)) in groups {
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome =
                    match tokio::time::timeout(BATCH_TIMEOUT, insert_batch(&shard, &group)).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout(format!(
                            "batch insert into {} exceeded {:?}",
                            shard.id(),
                            BATCH_TIMEOUT
                        ))),
                    };
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut first_error = None;
        for _ in 0..group_count {
            match rx.recv().await {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "failed to write batch to shard");
                    first_error.get_or_insert(err);
                }
                None => break,
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Claims the next free inventory slot on the routed shard and
    /// attaches the URL to it.
    ///
    /// Selecting and claiming happen in one transaction on the shard's
    /// single write connection, so two concurrent assignments cannot
    /// take the same slot.
    pub async fn assign_url(&self, url: &str) -> Result<UrlRecord> {
        let shard = self.coordinator.get_shard(url)?;

        let mut tx = shard.pool().begin().await.map_err(map_store_error)?;

        let row = sqlx::query(NEXT_FREE_SLOT)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::Exhausted(shard.id().to_string()))?;

        let short_key: String = row.try_get("short_key").map_err(map_store_error)?;
        let generation: i64 = row.try_get("generation").map_err(map_store_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_store_error)?;

        let now = Timestamp::now();
        sqlx::query(CLAIM_SLOT)
            .bind(url)
            .bind(now.as_second())
            .bind(&short_key)
            .execute(&mut *tx)
            .await
            .map_err(map_store_error)?;

        tx.commit().await.map_err(map_store_error)?;

        debug!(short_key = %short_key, shard = shard.id(), "assigned inventory slot");

        Ok(UrlRecord {
            short_key: ShortKey::new_unchecked(short_key),
            url: Some(url.to_string()),
            malicious: Some(0),
            generation,
            created_at: timestamp_from_seconds(created_at)?,
            updated_at: now,
            deleted_at: None,
        })
    }
}

async fn insert_batch(shard: &Shard, records: &[UrlRecord]) -> Result<()> {
    let placeholders = vec!["(?, ?, ?, ?, ?)"; records.len()].join(", ");
    let query = format!("{INSERT_COLUMNS}{placeholders}");

    let mut insert = sqlx::query(&query);
    for record in records {
        insert = insert
            .bind(record.url.as_deref())
            .bind(record.short_key.as_str())
            .bind(record.malicious)
            .bind(record.created_at.as_second())
            .bind(record.updated_at.as_second());
    }

    let mut tx = shard.pool().begin().await.map_err(map_store_error)?;
    insert.execute(&mut *tx).await.map_err(map_store_error)?;
    tx.commit().await.map_err(map_store_error)
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UrlRecord> {
    let created_at: i64 = row.try_get("created_at").map_err(map_store_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_store_error)?;
    let deleted_at: Option<i64> = row.try_get("deleted_at").map_err(map_store_error)?;
    let short_key: String = row.try_get("short_key").map_err(map_store_error)?;

    Ok(UrlRecord {
        short_key: ShortKey::new_unchecked(short_key),
        url: row.try_get("url").map_err(map_store_error)?,
        malicious: row.try_get("malicious").map_err(map_store_error)?,
        generation: row.try_get("generation").map_err(map_store_error)?,
        created_at: timestamp_from_seconds(created_at)?,
        updated_at: timestamp_from_seconds(updated_at)?,
        deleted_at: deleted_at.map(timestamp_from_seconds).transpose()?,
    })
}

fn timestamp_from_seconds(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|err| Error::Upstream(format!("invalid stored timestamp {seconds}: {err}")))
}
