use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tdfs_logging::LogConfig;
use tdfs_net::Server;
use tdfs_net_tcp::TcpListener;
use tdfs_storage_service::{FileStore, StorageServiceHandler, StorageServiceImpl};
use tdfs_types::Address;

/// tdfs storage node server
#[derive(Parser, Debug)]
#[command(name = "tdfs-storage-server", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "storage-server.toml")]
    config: String,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageServerConfig {
    /// Listen address, e.g. "TCP://0.0.0.0:9001".
    listen: String,

    /// Directory holding the stored file bytes.
    data_dir: PathBuf,

    #[serde(default)]
    log: LogConfig,
}

impl Default for StorageServerConfig {
    fn default() -> Self {
        Self {
            listen: "TCP://0.0.0.0:9001".to_string(),
            data_dir: PathBuf::from("tdfs-data"),
            log: LogConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", toml::to_string_pretty(&StorageServerConfig::default())?);
        return Ok(());
    }

    let raw = std::fs::read_to_string(&args.config)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", args.config, e))?;
    let config: StorageServerConfig = toml::from_str(&raw)?;

    let _log_guard = tdfs_logging::init_logging(&config.log);
    tracing::info!(config = %args.config, data_dir = %config.data_dir.display(), "starting tdfs storage server");

    let service = Arc::new(StorageServiceImpl::new(FileStore::new(&config.data_dir)));

    let listen: Address = config
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("bad listen address {:?}: {}", config.listen, e))?;
    let listener = TcpListener::bind(listen).await?;
    let addr = listener.local_address();

    let mut server = Server::new();
    server.register_service(Box::new(StorageServiceHandler::new(service)));
    server.start(listener);
    tracing::info!(%addr, "storage server serving");

    wait_for_shutdown_signal().await;
    server.stop();
    tracing::info!("storage server shut down");
    Ok(())
}

/// Wait for CTRL+C or SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = ctrl_c => { tracing::info!("received CTRL+C"); }
        _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
    }
}
