//! Pre-generation of short-key batches.
//!
//! The write path of the inventory never computes keys on demand;
//! everything is manufactured ahead of time by the generators in this
//! crate and bulk-inserted by the seeding pipeline.

pub mod base58;
mod permute;

pub use permute::PermuteGenerator;

use rand::seq::SliceRandom;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// A deterministic stream of `prefix + base58(n)` keys for
/// `n ∈ [last, last + size)`, delivered in shuffled batches.
///
/// The stream is pull-based: the producer computes a batch only after
/// the consumer asks for one, so it never races ahead of the insert
/// stage it feeds.
#[derive(Debug, Clone)]
pub struct Base58KeyGenerator {
    last: u64,
    size: u64,
    prefix: String,
}

impl Base58KeyGenerator {
    /// Creates a generator for `size` keys starting at `last`,
    /// prefixed with the shard letter.
    pub fn new(last: u64, size: u64, prefix: impl Into<String>) -> Self {
        Self {
            last,
            size,
            prefix: prefix.into(),
        }
    }

    /// Spawns the producer task and returns the consumer handle.
    ///
    /// The producer terminates once every batch has been handed over,
    /// or as soon as the handle is dropped (a pending batch is
    /// discarded).
    pub fn spawn(self, batch_size: u64) -> KeyBatches {
        let (jobs_tx, jobs_rx) = mpsc::channel(1);
        tokio::spawn(self.produce(jobs_rx, batch_size.max(1)));
        KeyBatches { jobs: jobs_tx }
    }

    async fn produce(
        self,
        mut jobs: mpsc::Receiver<oneshot::Sender<Vec<String>>>,
        batch_size: u64,
    ) {
        let mut produced = 0u64;

        while produced < self.size {
            // Rendezvous: wait for the consumer's reply channel before
            // computing anything.
            let Some(reply) = jobs.recv().await else {
                debug!(prefix = %self.prefix, produced, "consumer gone, closing key stream");
                return;
            };

            let count = batch_size.min(self.size - produced);
            let mut batch = Vec::with_capacity(count as usize);
            for n in 0..count {
                let value = self.last + produced + n;
                batch.push(format!("{}{}", self.prefix, base58::encode(value)));
            }
            produced += count;

            // Shuffling keeps the in-store insert order non-monotonic,
            // which spreads B-tree page pressure in the shard store.
            let rounds = batch.len().div_ceil(3);
            shuffle(&mut batch, rounds);

            if reply.send(batch).is_err() {
                return;
            }
        }

        debug!(prefix = %self.prefix, produced, "key stream completed");
    }
}

/// Consumer side of a spawned [`Base58KeyGenerator`].
#[derive(Debug)]
pub struct KeyBatches {
    jobs: mpsc::Sender<oneshot::Sender<Vec<String>>>,
}

impl KeyBatches {
    /// Requests the next batch, blocking until the producer fills it.
    ///
    /// Returns `None` once the stream is exhausted.
    pub async fn next_batch(&mut self) -> Option<Vec<String>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.jobs.send(reply_tx).await.ok()?;
        reply_rx.await.ok()
    }
}

/// Shuffles the slice in place the given number of times with a
/// uniform random permutation.
fn shuffle<T>(items: &mut [T], times: usize) {
    let mut rng = rand::thread_rng();
    for _ in 0..times {
        items.shuffle(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn drain(mut batches: KeyBatches) -> Vec<Vec<String>> {
        let mut all = Vec::new();
        while let Some(batch) = batches.next_batch().await {
            all.push(batch);
        }
        all
    }

    #[tokio::test]
    async fn emits_batches_with_a_short_tail() {
        let batches = Base58KeyGenerator::new(0, 5, "a").spawn(2);
        let all = drain(batches).await;

        let sizes: Vec<usize> = all.iter().map(Vec::len).collect();
        assert_eq!(sizes, [2, 2, 1]);

        let union: HashSet<String> = all.into_iter().flatten().collect();
        let expected: HashSet<String> =
            ["a1", "a2", "a3", "a4", "a5"].map(String::from).into();
        assert_eq!(union, expected);
    }

    #[tokio::test]
    async fn zero_size_closes_immediately() {
        let mut batches = Base58KeyGenerator::new(0, 0, "a").spawn(10);
        assert_eq!(batches.next_batch().await, None);
    }

    #[tokio::test]
    async fn key_set_is_stable_across_batch_sizes() {
        let coarse = drain(Base58KeyGenerator::new(1_000, 100, "q").spawn(100)).await;
        let fine = drain(Base58KeyGenerator::new(1_000, 100, "q").spawn(7)).await;

        let coarse: HashSet<String> = coarse.into_iter().flatten().collect();
        let fine: HashSet<String> = fine.into_iter().flatten().collect();
        assert_eq!(coarse.len(), 100);
        assert_eq!(coarse, fine);
    }

    #[tokio::test]
    async fn keys_carry_the_prefix() {
        let all = drain(Base58KeyGenerator::new(1_000_000_000, 50, "m").spawn(16)).await;
        for key in all.into_iter().flatten() {
            assert!(key.starts_with('m'), "key {key} missing prefix");
        }
    }

    #[tokio::test]
    async fn exhausted_stream_keeps_returning_none() {
        let mut batches = Base58KeyGenerator::new(0, 3, "a").spawn(3);
        assert!(batches.next_batch().await.is_some());
        assert_eq!(batches.next_batch().await, None);
        assert_eq!(batches.next_batch().await, None);
    }

    #[test]
    fn shuffle_preserves_the_set() {
        let mut items: Vec<u32> = (0..100).collect();
        shuffle(&mut items, 34);
        let set: HashSet<u32> = items.iter().copied().collect();
        assert_eq!(set.len(), 100);
    }
}
