//! Harbor serve command: run the plugin host behind the HTTP server

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use harbor_server::{HarborServer, ServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{dylib_host, override_plugin_dir};
use crate::config::ConfigLoader;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Plugin directory (overrides config)
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,
}

/// Run the server in the foreground until Ctrl-C
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let server_config = ServerConfig::new(
        args.host.unwrap_or(config.server.host),
        args.port.unwrap_or(config.server.port),
    );
    let host = dylib_host(override_plugin_dir(config.plugins, args.plugin_dir));

    info!(
        addr = %server_config.addr(),
        plugin_dir = %host.config().plugin_dir.display(),
        "Starting harbor server"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    HarborServer::new(server_config, host).run(shutdown).await?;
    Ok(())
}
