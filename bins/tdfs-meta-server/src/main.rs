use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tdfs_logging::LogConfig;
use tdfs_meta_service::{MetaServiceHandler, MetaServiceImpl, RpcNodePinger};
use tdfs_net::Server;
use tdfs_net_tcp::TcpListener;
use tdfs_types::Address;

/// tdfs metadata server
#[derive(Parser, Debug)]
#[command(name = "tdfs-meta-server", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "meta-server.toml")]
    config: String,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetaServerConfig {
    /// Listen address, e.g. "TCP://0.0.0.0:9000".
    listen: String,

    /// Storage node addresses to register at startup. Each node must pass
    /// the challenge/response handshake before it enters the registry.
    #[serde(default)]
    storage_nodes: Vec<String>,

    #[serde(default)]
    log: LogConfig,
}

impl Default for MetaServerConfig {
    fn default() -> Self {
        Self {
            listen: "TCP://0.0.0.0:9000".to_string(),
            storage_nodes: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", toml::to_string_pretty(&MetaServerConfig::default())?);
        return Ok(());
    }

    let raw = std::fs::read_to_string(&args.config)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", args.config, e))?;
    let config: MetaServerConfig = toml::from_str(&raw)?;

    let _log_guard = tdfs_logging::init_logging(&config.log);
    tracing::info!(config = %args.config, "starting tdfs metadata server");

    let service = Arc::new(MetaServiceImpl::new(Arc::new(RpcNodePinger::new())));
    for node in &config.storage_nodes {
        let addr: Address = node
            .parse()
            .map_err(|e| anyhow::anyhow!("bad storage node address {:?}: {}", node, e))?;
        service.register_storage_node(addr).await?;
    }
    tracing::info!(nodes = config.storage_nodes.len(), "storage nodes registered");

    let listen: Address = config
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("bad listen address {:?}: {}", config.listen, e))?;
    let listener = TcpListener::bind(listen).await?;
    let addr = listener.local_address();

    let mut server = Server::new();
    server.register_service(Box::new(MetaServiceHandler::new(service)));
    server.start(listener);
    tracing::info!(%addr, "metadata server serving");

    wait_for_shutdown_signal().await;
    server.stop();
    tracing::info!("metadata server shut down");
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
