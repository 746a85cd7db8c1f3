//! SwapWatch Server
//!
//! Routes authenticated swap webhook notifications to ephemeral rooms of
//! live WebSocket viewers.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use swapwatch_core::index::WalletIndex;
use swapwatch_core::notify::LogNotifier;
use swapwatch_core::room::{RoomDeps, RoomRegistry, RoomStore};
use swapwatch_core::router::EventRouter;
use swapwatch_core::sync::{FilterSyncHandle, FilterSyncWorker, HttpFilterSync, filter_sync_channel};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// SwapWatch - swap notification rooms over WebSocket
#[derive(Parser, Debug)]
#[command(name = "swapwatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./swapwatch-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Skip database migrations on startup
    #[arg(long, default_value = "false")]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting swapwatch-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let upstream = loaded_config.upstream.clone();
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Database (SQLite file, created on first run)
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;
    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to open database: {}", e);
            e
        })?;
    tracing::info!("Database opened");

    if !args.no_migrate {
        swapwatch_core::run_migrations(&db_pool).await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;
        tracing::info!("Migrations up to date");
    }

    // Core components
    let index = WalletIndex::new(db_pool.clone());
    let store = RoomStore::new(db_pool.clone());

    let (sync_shutdown_tx, sync_shutdown_rx) = tokio::sync::watch::channel(false);
    let sync_handle = match upstream {
        Some(upstream) => {
            let (handle, trigger_rx) = filter_sync_channel();
            let worker = FilterSyncWorker::new(
                index.clone(),
                Arc::new(HttpFilterSync::new(upstream.filter_url, upstream.auth_token)),
            );
            tokio::spawn(worker.run(trigger_rx, sync_shutdown_rx));
            handle
        }
        None => {
            tracing::info!("No [upstream] section configured, filter sync disabled");
            FilterSyncHandle::disconnected()
        }
    };

    let default_ttl_hours = loaded_config.rooms.default_ttl_hours;
    let deps = RoomDeps {
        store,
        index: index.clone(),
        sync: sync_handle,
        notifier: Arc::new(LogNotifier),
    };
    let registry = RoomRegistry::new(deps, default_ttl_hours);
    let router = EventRouter::new(index, registry.clone());

    let state = AppState::new(registry, router, loaded_config.into_shared());

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Run the server
    let app = build_router(state);
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(app, listen_addr).await;

    // Stop background tasks and close the pool
    let _ = sync_shutdown_tx.send(true);
    shutdown_notify.notify_one();
    tracing::info!("Closing database...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
