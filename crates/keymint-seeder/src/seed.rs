use crate::fill::fill_key_range;
use crate::starts::SeedStarts;
use crate::RangeRun;
use keymint_core::{Catalog, Result};
use keymint_sharding::{PrefixPolicy, SeedStatus, ShardCoordinator, ShardStatus, ShardStatusStore};
use keymint_storage::ShardedUrlRepository;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Bootstraps every shard store and populates the whole inventory.
///
/// One task per key range generates `seed_size` keys for each of the
/// range's canonical letters. Progress rows are written to the
/// coordinator store up front as `processing` and advanced to
/// `processed` (or `failed`) once the range lands, so an interrupted
/// run is visible and a later refill resumes from the recorded window.
pub async fn seed(
    base_dir: &Path,
    batch_size: u64,
    seed_size: u64,
    starts: &SeedStarts,
) -> Result<()> {
    let catalog = Catalog::url_keys();
    let ranges = catalog.shards(5);

    let total_keys = seed_size as u128 * catalog.lowers().len() as u128;
    info!(n_keys = %total_keys, "generating url keys");

    let mut coordinator = ShardCoordinator::with_base_dir(ranges.clone(), base_dir);
    coordinator.bootstrap().await?;
    let status_pool = coordinator.connect_coordinator().await?;

    let coordinator = Arc::new(coordinator);
    coordinator.set_policy(Arc::new(PrefixPolicy::new(
        coordinator.get_shards().to_vec(),
    )));

    let repo = ShardedUrlRepository::new(coordinator.clone());
    let status_store = ShardStatusStore::new(status_pool);

    // Record every letter's window before generating anything.
    let mut rows = Vec::new();
    for range in &ranges {
        for letter in catalog.letters_in(range) {
            rows.push(ShardStatus::initial(
                range.to_string(),
                letter,
                starts.start_for(letter),
                seed_size,
            ));
        }
    }
    status_store.insert(&rows).await?;

    let (tx, mut rx) = mpsc::channel(ranges.len());

    for range in ranges.iter().copied() {
        info!(range = %range, "generating keys for shard");

        let letters = catalog.letters_in(&range);
        let repo = repo.clone();
        let starts = starts.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = fill_key_range(
                &range,
                &letters,
                |letter| starts.start_for(letter),
                batch_size,
                seed_size,
                &repo,
            )
            .await;

            let _ = tx
                .send(RangeRun {
                    range,
                    letters,
                    skipped: false,
                    result,
                })
                .await;
        });
    }
    drop(tx);

    let mut first_error = None;

    while let Some(run) = rx.recv().await {
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
            sync_letter(&status_store, &shard_id, letter, status).await;
        }
    }

    coordinator.teardown().await;

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Advances one letter's `processing` row to its final status.
///
/// Status-sync failures are logged but do not fail the run; the row
/// stays at its prior generation and the next run re-reads it.
async fn sync_letter(
    status_store: &ShardStatusStore,
    shard_id: &str,
    letter: char,
    status: SeedStatus,
) {
    let shard_char = letter.to_string();

    let current = match status_store.last_state(shard_id, &shard_char).await {
        Ok(current) => current,
        Err(err) => {
            error!(shard = shard_id, shard_char = %shard_char, error = %err, "failed to read shard status");
            return;
        }
    };

    if let Err(err) = status_store.advance(&current, current.end, status).await {
        error!(shard = shard_id, shard_char = %shard_char, error = %err, "failed to sync to coordinator db");
    }
}
