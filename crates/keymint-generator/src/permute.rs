use keymint_core::Catalog;
use tokio::sync::mpsc;

/// Exhaustive enumeration of every key of a fixed length.
///
/// Unlike [`Base58KeyGenerator`](crate::Base58KeyGenerator), which
/// walks an integer window, this generator permutes the whole catalog:
/// the first character comes from the letters (lower and upper), the
/// remaining positions from letters plus digits. Useful for sizing
/// experiments on short key lengths; the batch channel is buffered, so
/// the producer runs ahead of the consumer.
#[derive(Debug, Clone, Copy)]
pub struct PermuteGenerator {
    catalog: Catalog,
}

const BATCH_BUFFER: usize = 100;

impl PermuteGenerator {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Spawns the producer and returns the stream of batches covering
    /// all keys of the given length.
    pub fn spawn(self, length: u32, batch_size: usize) -> mpsc::Receiver<Vec<String>> {
        let (tx, rx) = mpsc::channel(BATCH_BUFFER);

        let mut alphas: Vec<char> = self.catalog.lowers().to_vec();
        alphas.extend_from_slice(self.catalog.uppers());

        let mut chars = alphas.clone();
        chars.extend_from_slice(self.catalog.digits());

        tokio::spawn(async move {
            let total = alphas.len() as u64 * (chars.len() as u64).pow(length.saturating_sub(1));

            let mut batch = Vec::with_capacity(batch_size);
            for index in 0..total {
                batch.push(key_at(&alphas, &chars, index, length));

                if batch.len() == batch_size {
                    if tx.send(std::mem::take(&mut batch)).await.is_err() {
                        return;
                    }
                    batch.reserve(batch_size);
                }
            }

            if !batch.is_empty() {
                let _ = tx.send(batch).await;
            }
        });

        rx
    }
}

/// Builds the key at a given index of the permutation space.
fn key_at(alphas: &[char], chars: &[char], index: u64, length: u32) -> String {
    let mut key = String::with_capacity(length as usize);
    let mut index = index;

    key.push(alphas[(index % alphas.len() as u64) as usize]);
    index /= alphas.len() as u64;

    for _ in 1..length {
        key.push(chars[(index % chars.len() as u64) as usize]);
        index /= chars.len() as u64;
    }

    key
}
