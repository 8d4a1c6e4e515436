use crate::policy::RoutingPolicy;
use crate::schema;
use crate::shard::Shard;
use crate::map_store_error;
use keymint_core::{Error, KeyRange, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info};

/// How a shard store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Fixed filename of the coordinator store.
pub const COORDINATOR_DB: &str = "shard_coordinator.db";

const BOOTSTRAP_DEADLINE: Duration = Duration::from_secs(120);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns every shard store handle plus the coordinator store.
///
/// The coordinator materializes the key-range partition into
/// file-backed SQLite stores (`<id>.db` per range), applies the schema,
/// and routes keys to shards through an installed policy. Repositories
/// and pipelines borrow shards through it; teardown closes everything.
pub struct ShardCoordinator {
    base_dir: PathBuf,
    ranges: Vec<KeyRange>,
    shards: Vec<Shard>,
    policy: RwLock<Option<Arc<dyn RoutingPolicy>>>,
    coordinator_pool: Option<SqlitePool>,
}

impl ShardCoordinator {
    /// Creates a coordinator over the given ranges, with stores in the
    /// current working directory.
    pub fn new(ranges: Vec<KeyRange>) -> Self {
        Self::with_base_dir(ranges, ".")
    }

    /// Creates a coordinator with stores under the given directory.
    pub fn with_base_dir(ranges: Vec<KeyRange>, base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            ranges,
            shards: Vec::new(),
            policy: RwLock::new(None),
            coordinator_pool: None,
        }
    }

    /// Opens one store per range read-write and applies the URL schema
    /// to each in parallel, under an overall two-minute deadline.
    ///
    /// If any store fails to open or migrate, every already-opened
    /// connection is closed and the whole bootstrap fails.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.open_shards(OpenMode::ReadWrite).await?;

        let mut tasks = JoinSet::new();
        for shard in &self.shards {
            let pool = shard.pool().clone();
            let id = shard.id().to_string();
            info!(store = %id, "creating shard store schema");

            tasks.spawn(async move {
                for statement in [
                    schema::CREATE_URLS_TABLE,
                    schema::CREATE_SHORT_KEY_INDEX,
                    schema::CREATE_NULL_URL_INDEX,
                ] {
                    sqlx::query(statement).execute(&pool).await?;
                }
                Ok::<_, sqlx::Error>(id)
            });
        }

        let migrate = async {
            let mut first_error = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        error!(error = %err, "failed to create shard schema");
                        first_error.get_or_insert(map_store_error(err));
                    }
                    Err(err) => {
                        first_error.get_or_insert(Error::Upstream(err.to_string()));
                    }
                }
            }
            first_error
        };

        let outcome = tokio::time::timeout(BOOTSTRAP_DEADLINE, migrate).await;

        let failure = match outcome {
            Ok(None) => None,
            Ok(Some(err)) => Some(err),
            Err(_) => Some(Error::Timeout(
                "shard store bootstrap exceeded its deadline".to_string(),
            )),
        };

        if let Some(err) = failure {
            self.teardown().await;
            return Err(err);
        }

        Ok(())
    }

    /// Opens one store per range without touching the schema.
    pub async fn connect(&mut self, mode: OpenMode) -> Result<()> {
        self.open_shards(mode).await
    }

    /// Opens the coordinator store and ensures the `shard_status`
    /// schema exists. Returns a handle to the pool.
    pub async fn connect_coordinator(&mut self) -> Result<SqlitePool> {
        if let Some(pool) = &self.coordinator_pool {
            return Ok(pool.clone());
        }

        let path = self.base_dir.join(COORDINATOR_DB);
        let pool = open_store(&path, OpenMode::ReadWrite).await?;

        sqlx::query(schema::CREATE_SHARD_STATUS_TABLE)
            .execute(&pool)
            .await
            .map_err(map_store_error)?;

        self.coordinator_pool = Some(pool.clone());
        Ok(pool)
    }

    /// Installs the routing policy used by subsequent `get_shard`
    /// calls.
    pub fn set_policy(&self, policy: Arc<dyn RoutingPolicy>) {
        if let Ok(mut slot) = self.policy.write() {
            *slot = Some(policy);
        }
    }

    /// Routes a key through the installed policy.
    pub fn get_shard(&self, key: &str) -> Result<Shard> {
        let policy = self
            .policy
            .read()
            .map_err(|_| Error::Upstream("routing policy lock poisoned".to_string()))?;

        policy
            .as_ref()
            .ok_or_else(|| Error::Invalid("no routing policy installed".to_string()))?
            .route(key)
    }

    /// All shards, in range order.
    pub fn get_shards(&self) -> &[Shard] {
        &self.shards
    }

    /// The coordinator store pool, if connected.
    pub fn coordinator_pool(&self) -> Option<&SqlitePool> {
        self.coordinator_pool.as_ref()
    }

    /// Closes every shard store and the coordinator store. Idempotent.
    pub async fn teardown(&self) {
        for shard in &self.shards {
            shard.pool().close().await;
        }
        if let Some(pool) = &self.coordinator_pool {
            pool.close().await;
        }
    }

    async fn open_shards(&mut self, mode: OpenMode) -> Result<()> {
        for stale in self.shards.drain(..) {
            stale.pool().close().await;
        }

        let mut shards = Vec::with_capacity(self.ranges.len());

        for range in &self.ranges {
            let id = range.store_id();
            let path = self.base_dir.join(format!("{id}.db"));
            info!(store = %id, path = %path.display(), "connecting to shard store");

            match open_store(&path, mode).await {
                Ok(pool) => shards.push(Shard::new(id, *range, pool)),
                Err(err) => {
                    for opened in &shards {
                        opened.pool().close().await;
                    }
                    return Err(err);
                }
            }
        }

        self.shards = shards;
        Ok(())
    }
}

impl std::fmt::Debug for ShardCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardCoordinator")
            .field("base_dir", &self.base_dir)
            .field("ranges", &self.ranges)
            .field("shards", &self.shards.len())
            .finish()
    }
}

async fn open_store(path: &Path, mode: OpenMode) -> Result<SqlitePool> {
    let options = store_options(path, mode);

    SqlitePoolOptions::new()
        // A single connection: the driver serializes writes internally
        // and WAL lets readers proceed alongside them.
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(map_store_error)
}

fn store_options(path: &Path, mode: OpenMode) -> SqliteConnectOptions {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .shared_cache(true)
        .busy_timeout(BUSY_TIMEOUT)
        .pragma("temp_store", "MEMORY")
        // Negative cache_size is KiB: ~2MB of page cache per store.
        .pragma("cache_size", "-2000")
        .pragma("mmap_size", "30000000000");

    match mode {
        OpenMode::ReadOnly => options.read_only(true),
        OpenMode::ReadWrite => options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("journal_size_limit", "104857600")
            // Advisory; SQLite treats unknown values as a no-op.
            .pragma("threads", "10"),
    }
}
