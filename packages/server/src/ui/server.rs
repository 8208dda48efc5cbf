//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{config::ServerConfig, domain::InstanceId, domain::SyncError};

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Signaling server
///
/// This struct holds the wired application state and serves the WebSocket and HTTP endpoints.
///
/// # Example
///
/// ```ignore
/// let config = ServerConfig::default();
/// let server = Server::from_config(&config)?;
/// server.run(config.host.clone(), config.port).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Wire a server from the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the store URL cannot be parsed.
    pub fn from_config(config: &ServerConfig) -> Result<Self, SyncError> {
        let backend = config.sync_backend()?;
        let instance_id = InstanceId::generate();
        tracing::info!("Server instance id: {}", instance_id);
        Ok(Self::new(AppState::build(
            backend,
            instance_id,
            config.room_ttl,
        )))
    }

    /// Run the signaling server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Signaling server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// The first subscription attempt to other server instances is made before the
    /// first connection is accepted. It is bounded by the store timeout; when the
    /// store is unreachable the server serves single-process and keeps retrying
    /// in the background.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sync_task = self.state.sync.clone().start().await;

        let app = Router::new()
            // WebSocket エンドポイント
            .route("/", get(websocket_handler))
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sync_task.abort();
        result
    }
}
