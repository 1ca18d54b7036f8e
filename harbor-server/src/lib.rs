//! harbor-server - HTTP serving layer for the plugin host
//!
//! The server owns the [`PluginHost`]: it starts the host with the builtin
//! base routes, serves the resulting aggregate route table, and runs the
//! host shutdown sweep once the listener has stopped.

mod builtin;
mod error;
pub mod http;
mod state;

use std::sync::Arc;

use harbor_core::{PluginHost, StartupReport};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use builtin::{HELLO_GREETING, builtin_routes};
pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// Default port the server listens on
pub const DEFAULT_PORT: u16 = 7480;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:7480")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The harbor server
pub struct HarborServer {
    config: ServerConfig,
    host: PluginHost,
}

impl HarborServer {
    pub fn new(config: ServerConfig, host: PluginHost) -> Self {
        Self { config, host }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the plugin host and build the shared state it serves
    pub fn start_host(&mut self) -> Result<(StartupReport, Arc<AppState>), ServerError> {
        let report = self.host.start_up_with(builtin_routes)?;
        for failure in &report.failures {
            tracing::warn!(%failure, "Plugin failure during start-up");
        }
        let state = Arc::new(AppState::new(
            self.host.route_table(),
            report.extensions.clone(),
        ));
        Ok((report, state))
    }

    /// Run until `shutdown` is cancelled, then stop every plugin.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let (_report, state) = self.start_host()?;

        let addr = self.config.addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                drop(state);
                self.host.shutdown()?;
                return Err(ServerError::Bind { addr, source });
            }
        };

        tracing::info!("harbor server listening on {}", addr);

        let router = create_router(state);
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        tracing::info!("HTTP listener stopped, shutting down plugins");
        self.host.shutdown()?;
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::{Dependencies, HostConfig};

    fn empty_host() -> (tempfile::TempDir, PluginHost) {
        let dir = tempfile::TempDir::new().unwrap();
        let host = PluginHost::new(
            HostConfig::with_plugin_dir(dir.path()),
            Box::new(harbor_core::StaticNamespaceProvider::new()),
            Arc::new(Dependencies::new()),
        );
        (dir, host)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_server_config_addr() {
        let config = ServerConfig::new("0.0.0.0", 8080);
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_start_host_serves_builtin_routes() {
        let (_dir, host) = empty_host();
        let mut server = HarborServer::new(ServerConfig::default(), host);
        let (report, state) = server.start_host().unwrap();
        assert_eq!(report.discovered, 0);
        assert_eq!(state.routes.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (_dir, host) = empty_host();
        let server = HarborServer::new(ServerConfig::new("127.0.0.1", 0), host);
        let token = CancellationToken::new();
        let handle = tokio::spawn(server.run(token.clone()));

        token.cancel();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }
}
