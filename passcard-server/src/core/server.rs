//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::build_app;
use crate::core::{Config, Result, ServerError, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Bind `0.0.0.0:{http_port}` and serve until ctrl-c
    pub async fn run(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    ///
    /// Stops on ctrl-c or when the state's shutdown token is cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let watcher = state.start_background_tasks();
        let app = build_app().with_state(state.clone());

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "Passcard print server listening");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;

        state.shutdown().await;
        if let Err(e) = watcher.await {
            tracing::warn!(error = %e, "Config watcher ended abnormally");
        }
        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
        _ = token.cancelled() => {}
    }
}
