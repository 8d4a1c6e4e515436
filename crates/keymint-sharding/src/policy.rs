use crate::shard::Shard;
use keymint_core::{Error, Result};
use std::sync::Mutex;

/// A key→shard routing decision.
///
/// Policies are pure: no I/O, deterministic given their state. Reads
/// route by prefix, writes spread load round-robin, and hash routing
/// covers keys with no meaningful prefix.
pub trait RoutingPolicy: Send + Sync {
    fn route(&self, key: &str) -> Result<Shard>;
}

/// Routes by the first character of the key, lowercased, to the shard
/// whose key range covers it.
#[derive(Debug)]
pub struct PrefixPolicy {
    shards: Vec<Shard>,
}

impl PrefixPolicy {
    pub fn new(shards: Vec<Shard>) -> Self {
        Self { shards }
    }
}

impl RoutingPolicy for PrefixPolicy {
    fn route(&self, key: &str) -> Result<Shard> {
        let first = key
            .chars()
            .next()
            .ok_or_else(|| Error::Invalid("cannot route an empty key".to_string()))?;

        self.shards
            .iter()
            .find(|shard| shard.key_range().contains(first))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("no shard covers key '{key}'")))
    }
}

/// Routes by a 32-bit FNV-1a hash of the key bytes, modulo the shard
/// count. Shards are sorted by id at construction so the mapping is
/// stable for the lifetime of the process.
#[derive(Debug)]
pub struct HashPolicy {
    shards: Vec<Shard>,
}

impl HashPolicy {
    pub fn new(mut shards: Vec<Shard>) -> Self {
        shards.sort_by(|a, b| a.id().cmp(b.id()));
        Self { shards }
    }
}

impl RoutingPolicy for HashPolicy {
    fn route(&self, key: &str) -> Result<Shard> {
        if self.shards.is_empty() {
            return Err(Error::NotFound("no shards registered".to_string()));
        }

        let index = fnv1a_32(key.as_bytes()) as usize % self.shards.len();
        Ok(self.shards[index].clone())
    }
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Ignores the key entirely and hands out shards in rotation.
///
/// The index advances under a mutex, so concurrent writers spread
/// evenly across shards.
#[derive(Debug)]
pub struct RoundRobinPolicy {
    shards: Vec<Shard>,
    next: Mutex<usize>,
}

impl RoundRobinPolicy {
    pub fn new(shards: Vec<Shard>) -> Self {
        Self {
            shards,
            next: Mutex::new(0),
        }
    }
}

impl RoutingPolicy for RoundRobinPolicy {
    fn route(&self, _key: &str) -> Result<Shard> {
        if self.shards.is_empty() {
            return Err(Error::NotFound("no shards registered".to_string()));
        }

        let mut next = self
            .next
            .lock()
            .map_err(|_| Error::Upstream("round-robin index poisoned".to_string()))?;

        let shard = self.shards[*next].clone();
        *next = (*next + 1) % self.shards.len();
        Ok(shard)
    }
}
