//! shellbridge daemon
//!
//! Exposes three device capabilities to a shell front-end over a Unix
//! socket: application enumeration, application launch, and a battery-level
//! event stream.

mod proto;
mod server;

use std::path::PathBuf;

use tokio::net::UnixListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shellbridge_core::Config;
use shellbridge_platform::Platform;

use crate::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("shellbridge - platform bridge daemon for shell front-ends");
        println!();
        println!("Usage: shellbridge [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --socket PATH    Listen on PATH instead of the configured socket");
        println!("  --help, -h       Show this help message");
        std::process::exit(0);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shellbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load();

    let socket_path = args
        .iter()
        .position(|a| a == "--socket")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| config.socket_path());

    // Initialize platform
    let platform = Platform::current(&config);

    // Stale socket from a previous run
    let _ = std::fs::remove_file(&socket_path);

    let listener = UnixListener::bind(&socket_path)?;
    tracing::info!("Listening on {}", socket_path.display());

    let server = Server::new(platform);

    tokio::select! {
        result = server.run(listener) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}
