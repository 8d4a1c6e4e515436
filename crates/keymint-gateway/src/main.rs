mod app;
mod error;
mod handlers;
mod model;
mod state;

use app::App;
use clap::Parser;
use keymint_core::Catalog;
use keymint_sharding::{OpenMode, PrefixPolicy, RoundRobinPolicy, ShardCoordinator};
use keymint_storage::ShardedUrlRepository;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub const LISTEN_ADDR_ENV: &str = "KEYMINT_GATEWAY_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "KEYMINT_BASE_URL";
pub const DATA_DIR_ENV: &str = "KEYMINT_DATA_DIR";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9091";

#[derive(Debug, Parser)]
#[command(name = "keymint-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public base URL embedded in created short links.
    #[arg(long, env = BASE_URL_ENV, default_value = "http://localhost:9091")]
    pub base_url: String,

    /// Directory holding the shard store files.
    #[arg(long, env = DATA_DIR_ENV, default_value = ".")]
    pub data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = CLI::parse();
    let ranges = Catalog::url_keys().shards(5);

    // Reads route by prefix over read-only handles; writes claim slots
    // round-robin over read-write handles. Two coordinators, same
    // store files.
    let mut lookup_coordinator =
        ShardCoordinator::with_base_dir(ranges.clone(), &cli.data_dir);
    lookup_coordinator.connect(OpenMode::ReadOnly).await?;
    let lookup_coordinator = Arc::new(lookup_coordinator);
    lookup_coordinator.set_policy(Arc::new(PrefixPolicy::new(
        lookup_coordinator.get_shards().to_vec(),
    )));

    let mut assign_coordinator = ShardCoordinator::with_base_dir(ranges, &cli.data_dir);
    assign_coordinator.connect(OpenMode::ReadWrite).await?;
    let assign_coordinator = Arc::new(assign_coordinator);
    assign_coordinator.set_policy(Arc::new(RoundRobinPolicy::new(
        assign_coordinator.get_shards().to_vec(),
    )));

    let state = AppState::builder()
        .lookup(ShardedUrlRepository::new(lookup_coordinator.clone()))
        .assign(ShardedUrlRepository::new(assign_coordinator.clone()))
        .base_url(cli.base_url)
        .build();

    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "starting gateway server");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    lookup_coordinator.teardown().await;
    assign_coordinator.teardown().await;

    Ok(())
}
