use crate::fill::fill_key_range;
use crate::RangeRun;
use keymint_core::{Catalog, Result};
use keymint_sharding::{
    OpenMode, PrefixPolicy, Prober, SeedStatus, Shard, ShardCoordinator, ShardStatusStore,
    URL_KEYS_PROBER_QUERY,
};
use keymint_storage::ShardedUrlRepository;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// A shard with at least this many free slots is left alone.
pub const FILL_THRESHOLD: u64 = 10_000;

/// Tops up every shard that has dropped below [`FILL_THRESHOLD`] free
/// inventory slots.
pub async fn refill(base_dir: &Path, batch_size: u64, seed_size: u64) -> Result<()> {
    refill_with_threshold(base_dir, batch_size, seed_size, FILL_THRESHOLD).await
}

/// Refill with an explicit threshold.
///
/// Per shard: probe the free-slot count, skip when the shard is still
/// comfortable, otherwise continue each letter's key window from the
/// `end` recorded in the coordinator store and generate `seed_size`
/// more keys per letter. Affected letters get a CAS advance
/// (`end += seed_size`, generation +1) once the shard lands.
pub async fn refill_with_threshold(
    base_dir: &Path,
    batch_size: u64,
    seed_size: u64,
    threshold: u64,
) -> Result<()> {
    let catalog = Catalog::url_keys();
    let ranges = catalog.shards(5);

    let mut coordinator = ShardCoordinator::with_base_dir(ranges.clone(), base_dir);
    coordinator.connect(OpenMode::ReadWrite).await?;
    let status_pool = coordinator.connect_coordinator().await?;

    let coordinator = Arc::new(coordinator);
    coordinator.set_policy(Arc::new(PrefixPolicy::new(
        coordinator.get_shards().to_vec(),
    )));

    let repo = ShardedUrlRepository::new(coordinator.clone());
    let status_store = ShardStatusStore::new(status_pool);

    let (tx, mut rx) = mpsc::channel(ranges.len());

    for shard in coordinator.get_shards().iter().cloned() {
        let letters = catalog.letters_in(shard.key_range());
        let repo = repo.clone();
        let status_store = status_store.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let run = refill_shard(shard, letters, &status_store, &repo, batch_size, seed_size, threshold).await;
            let _ = tx.send(run).await;
        });
    }
    drop(tx);

    let mut first_error = None;

    while let Some(run) = rx.recv().await {
        if run.skipped {
            continue;
        }

        let status = match &run.result {
            Ok(()) => SeedStatus::Processed,
            Err(_) => SeedStatus::Failed,
        };

        if let Err(err) = run.result {
            error!(range = %run.range, error = %err, "failed to generate for key range");
            first_error.get_or_insert(err);
        }

        let shard_id = run.range.to_string();
        for letter in run.letters {
            let shard_char = letter.to_string();

            let current = match status_store.last_state(&shard_id, &shard_char).await {
                Ok(current) => current,
                Err(err) => {
                    error!(shard = %shard_id, shard_char = %shard_char, error = %err, "failed to read shard status");
                    continue;
                }
            };

            let new_end = match status {
                SeedStatus::Processed => current.end + seed_size as i64,
                _ => current.end,
            };

            if let Err(err) = status_store.advance(&current, new_end, status).await {
                error!(shard = %shard_id, shard_char = %shard_char, error = %err, "failed to sync to coordinator db");
            }
        }
    }

    coordinator.teardown().await;

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn refill_shard(
    shard: Shard,
    letters: Vec<char>,
    status_store: &ShardStatusStore,
    repo: &ShardedUrlRepository,
    batch_size: u64,
    seed_size: u64,
    threshold: u64,
) -> RangeRun {
    let range = *shard.key_range();

    let run = |skipped, result| RangeRun {
        range,
        letters: letters.clone(),
        skipped,
        result,
    };

    let prober = Prober::new(range.to_string(), shard.pool().clone(), URL_KEYS_PROBER_QUERY);
    let stats = match prober.stats().await {
        Ok(stats) => stats,
        Err(err) => return run(false, Err(err)),
    };

    if stats.empty_records >= threshold as i64 {
        info!(
            range = %range,
            free = stats.empty_records,
            "shard still has inventory, skipping"
        );
        return run(true, Ok(()));
    }

    // Resume each letter's window from the end the last run recorded
    // for the range's first letter.
    let state = match status_store
        .last_state(&range.to_string(), &range.start().to_string())
        .await
    {
        Ok(state) => state,
        Err(err) => return run(false, Err(err)),
    };

    let next = state.end as u64;
    let result = fill_key_range(&range, &letters, |_| next, batch_size, seed_size, repo).await;
    run(false, result)
}
