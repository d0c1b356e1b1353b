//! Lodestone Server Binary
//!
//! Starts the TCP server for Lodestone.

use clap::Parser;
use lodestone::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// Lodestone Server
#[derive(Parser, Debug)]
#[command(name = "lodestone-server")]
#[command(about = "In-memory key-value store server")]
#[command(version)]
struct Args {
    /// TCP port to listen on (binds 0.0.0.0)
    port: u16,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lodestone=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("Lodestone Server v{}", lodestone::VERSION);

    let config = Config::builder()
        .listen_addr(format!("0.0.0.0:{}", args.port))
        .max_connections(args.max_connections)
        .build();

    let mut server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
