//! CLI entry point (spec §10): loads a TOML config, builds the share
//! registry and identity store from it, and serves NFS+MOUNT over TCP
//! until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use nfs3_mamont::config::ServerConfig;
use nfs3_mamont::transport::Server;
use nfs3_mamont::vfs::mem::MemVfs;

#[derive(Parser, Debug)]
#[command(name = "nfs3-mamont-server", about = "A user-space NFSv3 server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, short)]
    config: PathBuf,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    nfs3_mamont::logging::init(&cli.log_level);

    let config = ServerConfig::load(&cli.config)?;
    let share_registry = Arc::new(config.share_registry());
    let identity_store = Arc::new(config.identity_store());
    let store = Arc::new(MemVfs::new());

    let server = Server::new(share_registry, identity_store, store);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "nfs3-mamont-server listening");

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    server.serve(listener).await?;
    Ok(())
}
