use keymint_core::{KeyRange, Result, ShortKey, UrlRecord};
use keymint_generator::Base58KeyGenerator;
use keymint_storage::ShardedUrlRepository;
use tracing::info;

/// Streams `seed_size` fresh keys for every letter of a range into the
/// inventory, one letter at a time.
///
/// Each letter gets its own generator; the handshake keeps the
/// producer exactly one batch ahead of the insert stage, and all of a
/// range's letters land in the same shard store, so inserts stay
/// serialized per store.
pub(crate) async fn fill_key_range(
    range: &KeyRange,
    letters: &[char],
    last_for: impl Fn(char) -> u64,
    batch_size: u64,
    seed_size: u64,
    repo: &ShardedUrlRepository,
) -> Result<()> {
    for &letter in letters {
        let last = last_for(letter);
        info!(range = %range, prefix = %letter, last, "inserting records for shard letter");

        let generator = Base58KeyGenerator::new(last, seed_size, letter.to_string());
        let mut batches = generator.spawn(batch_size);

        while let Some(batch) = batches.next_batch().await {
            let records = batch
                .into_iter()
                .map(|key| UrlRecord::free_slot(ShortKey::new_unchecked(key)))
                .collect();
            repo.create_batches(records).await?;
        }
    }

    Ok(())
}
