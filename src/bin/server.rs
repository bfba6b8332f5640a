//! TimberKV Server Binary
//!
//! Replays the reconstruction log and serves the line protocol over TCP.

use clap::Parser;
use timberkv::config::WalSyncStrategy;
use timberkv::seed::DEFAULT_SEED_COUNT;
use timberkv::{Config, Engine, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// TimberKV Server
#[derive(Parser, Debug)]
#[command(name = "timberkv-server")]
#[command(about = "B-Tree key-value store with a reconstruction log")]
#[command(version)]
struct Args {
    /// Reconstruction log file
    #[arg(short = 'f', long, default_value = "tree-log.txt")]
    log_path: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// B-Tree order (max children per node)
    #[arg(short, long, default_value = "5")]
    order: usize,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Serve from the seed file, generating it first if it is missing
    #[arg(long)]
    load_seeded: bool,

    /// Seed file used with --load-seeded
    #[arg(long, default_value = "seed-log.txt")]
    seed_path: String,

    /// Pairs to generate with --load-seeded
    #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
    seed_count: usize,

    /// fsync every N records instead of every record
    #[arg(long)]
    sync_every: Option<usize>,

    /// Let clients stop the server with SHUTDOWN
    #[arg(long)]
    allow_remote_shutdown: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,timberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let log_path = if args.load_seeded { &args.seed_path } else { &args.log_path };
    let sync_strategy = match args.sync_every {
        Some(count) => WalSyncStrategy::EveryNEntries { count },
        None => WalSyncStrategy::EveryWrite,
    };

    tracing::info!("TimberKV Server v{}", timberkv::VERSION);
    tracing::info!("Log file: {}", log_path);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .log_path(log_path)
        .listen_addr(&args.listen)
        .tree_order(args.order)
        .max_connections(args.max_connections)
        .wal_sync_strategy(sync_strategy)
        .allow_remote_shutdown(args.allow_remote_shutdown);
    if args.load_seeded {
        builder = builder.seed_count(args.seed_count);
    }
    let config = builder.build();

    // Open engine (replays the log)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized with {} keys", engine.len());

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.trigger();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    // Serve until shutdown
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
