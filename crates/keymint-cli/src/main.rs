use clap::{Parser, Subcommand};
use keymint_core::{parse_size, Catalog, KeyRange};
use keymint_seeder::{refill, seed, SeedStarts};
use keymint_sharding::{OpenMode, Prober, ShardCoordinator, URL_KEYS_PROBER_QUERY};
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "keymint", about = "Pre-generated short-key inventory tooling")]
struct Cli {
    /// Directory holding the shard store files.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bootstrap every shard store and populate the inventory.
    Seed {
        /// Length of short url keys.
        #[arg(long, default_value_t = 7)]
        keylen: usize,
        /// Batch size for bulk inserts.
        #[arg(long, default_value_t = 1000)]
        batches: u64,
        /// Count of keys to pre-populate per lowercase letter, e.g. 12M.
        #[arg(long, default_value = "12M")]
        size: String,
    },
    /// Top up shards that have run low on free inventory.
    Refill {
        /// Batch size to insert per key in range.
        #[arg(long, default_value_t = 1000)]
        batch: u64,
        /// Total number of entries per key in range, e.g. 100K.
        #[arg(long, default_value = "100K")]
        seed: String,
    },
    /// Run a stats query against every shard intersecting a key range.
    Probe {
        /// Key range to probe, e.g. a-b.
        #[arg(long, default_value = "a-b")]
        keyrange: String,
        /// Custom query to run instead of the free-slot count.
        #[arg(long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Seed {
            keylen,
            batches,
            size,
        } => {
            let seed_size = parse_size(&size)?;
            // The key length is governed by the seed start offsets; the
            // flag is recorded for visibility only.
            info!(keylen, batches, seed_size, "seeding inventory");

            seed(&cli.data_dir, batches, seed_size, &SeedStarts::default()).await?;
            info!("seeding database complete");
        }
        Command::Refill { batch, seed } => {
            let seed_size = parse_size(&seed)?;
            info!(batch, seed_size, "refilling inventory");

            refill(&cli.data_dir, batch, seed_size).await?;
            info!("refill complete");
        }
        Command::Probe { keyrange, query } => {
            probe(&cli.data_dir, &keyrange, query).await?;
        }
    }

    Ok(())
}

/// Probes every shard whose range intersects the requested one.
async fn probe(
    data_dir: &Path,
    keyrange: &str,
    query: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target: KeyRange = keyrange.parse()?;

    let intersecting: Vec<KeyRange> = Catalog::url_keys()
        .shards(5)
        .into_iter()
        .filter(|range| range.overlaps(&target))
        .collect();

    if intersecting.is_empty() {
        info!(keyrange = %target, "no shard intersects the requested range");
        return Ok(());
    }

    let mut coordinator = ShardCoordinator::with_base_dir(intersecting, data_dir);
    coordinator.connect(OpenMode::ReadOnly).await?;

    let query = query.unwrap_or_else(|| URL_KEYS_PROBER_QUERY.to_string());

    let mut tasks = JoinSet::new();
    for shard in coordinator.get_shards().iter().cloned() {
        let query = query.clone();
        tasks.spawn(async move {
            Prober::new(shard.key_range().to_string(), shard.pool().clone(), query)
                .stats()
                .await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(stats)) => {
                info!(shard = %stats.shard_key, empty_records = stats.empty_records, "shard stats");
            }
            Ok(Err(err)) => error!(error = %err, "failed to get shard stats"),
            Err(err) => error!(error = %err, "probe task panicked"),
        }
    }

    coordinator.teardown().await;
    Ok(())
}
