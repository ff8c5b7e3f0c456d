//! FileVault Server Binary
//!
//! Starts the reference backup server.

use std::sync::Arc;
use clap::Parser;
use filevault::Config;
use filevault::network::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// FileVault Server
#[derive(Parser, Debug)]
#[command(name = "filevault-server")]
#[command(about = "Reference server for the FileVault backup protocol")]
#[command(version)]
struct Args {
    /// Storage root directory
    #[arg(short, long, default_value = "./backupsvr")]
    root_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:5468")]
    listen: String,

    /// Payload chunk size in bytes
    #[arg(short, long, default_value = "1024")]
    chunk_size: usize,

    /// Connection read/write timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,filevault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("FileVault Server v{}", filevault::VERSION);
    tracing::info!("Root directory: {}", args.root_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .root_dir(&args.root_dir)
        .listen_addr(&args.listen)
        .chunk_size(args.chunk_size)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .build();

    let server = match Server::bind(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let handle = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        handle.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
