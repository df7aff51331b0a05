//! ttlkv - A Minimal In-Memory Key-Value Server
//!
//! This is the main entry point for the server.
//! It sets up logging, the store and the TCP listener, then serves until Ctrl+C.

use clap::Parser;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ttlkv::connection::ConnectionStats;
use ttlkv::storage::Store;
use ttlkv::Config;

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    init_tracing(&config.log_level);

    info!(version = ttlkv::VERSION, "Starting ttlkv");

    // Shared by every connection
    let store = Arc::new(Store::with_shards(config.shards));
    info!(shards = store.shard_count(), "Store initialized");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                // Keep serving; the process can still be stopped externally
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        _ = ttlkv::server::serve(listener, Arc::clone(&store), Arc::clone(&stats), config.frame_limits()) => {}
        _ = shutdown => {}
    }

    let store_stats = store.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        parse_errors = stats.parse_errors.load(Ordering::Relaxed),
        keys = store_stats.keys,
        expired = store_stats.expired,
        "Server shutdown complete"
    );
    Ok(())
}
