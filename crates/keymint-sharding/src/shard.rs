use keymint_core::KeyRange;
use sqlx::SqlitePool;

/// Handle to one embedded shard store.
///
/// Created by the coordinator at bootstrap, destroyed at teardown;
/// everything else borrows shards through the coordinator. The pool is
/// capped at a single connection, so the driver serializes writes while
/// readers share it freely.
#[derive(Debug, Clone)]
pub struct Shard {
    id: String,
    key_range: KeyRange,
    pool: SqlitePool,
}

impl Shard {
    pub fn new(id: impl Into<String>, key_range: KeyRange, pool: SqlitePool) -> Self {
        Self {
            id: id.into(),
            key_range,
            pool,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key_range(&self) -> &KeyRange {
        &self.key_range
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PartialEq for Shard {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Shard {}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn in_memory_shard(id: &str, range: &str) -> Shard {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Shard::new(id, KeyRange::parse(range).unwrap(), pool)
    }

    #[tokio::test]
    async fn equality_is_by_id() {
        let a = in_memory_shard("db_a_e", "a-e").await;
        let b = in_memory_shard("db_a_e", "f-j").await;
        let c = in_memory_shard("db_f_j", "f-j").await;

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
