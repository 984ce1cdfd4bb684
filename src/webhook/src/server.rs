//! HTTP server setup and lifecycle management
//!
//! This module handles:
//! - Server initialization and configuration
//! - TLS termination with rustls
//! - Graceful shutdown on signals (SIGTERM, SIGINT), draining in-flight requests

use crate::{routes, state::AppState, tls};
use anyhow::{bail, Context, Result};
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::{conn::auto, graceful::GracefulShutdown};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, info, warn};

/// Serving certificate and key paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in seconds
    pub request_timeout: u64,
    /// Maximum request body size in bytes
    pub max_body_bytes: usize,
    /// TLS material; plain HTTP when absent
    pub tls: Option<TlsPaths>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8443,
            request_timeout: 10,
            max_body_bytes: 1 << 20,
            tls: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Delay before accepting again after a failed `accept`
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP server instance
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Start the server and block until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on a bound listener until `shutdown` resolves, then drain
    /// in-flight requests
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let acceptor = match &self.config.tls {
            Some(paths) => {
                let config = tls::load_server_config(&paths.cert, &paths.key)
                    .context("failed to load TLS certificate")?;
                Some(tls::acceptor(config))
            }
            None => None,
        };

        let local_addr = listener.local_addr()?;
        let app = routes::create_router(self.state.clone(), &self.config);

        match acceptor {
            Some(acceptor) => {
                info!("Server listening on https://{}", local_addr);
                let drain_timeout = Duration::from_secs(self.config.request_timeout);
                serve_tls(listener, app, acceptor, shutdown, drain_timeout).await;
            }
            None => {
                warn!(
                    "No TLS certificate configured; serving plain HTTP on http://{}. \
                     The API server will not call a plain HTTP webhook",
                    local_addr
                );
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .context("Server error")?;
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Accept TLS connections until shutdown, serving each on its own task.
///
/// Open connections are asked to close once their current request is
/// answered; the drain gives up after `drain_timeout`.
async fn serve_tls<F>(
    listener: TcpListener,
    app: Router,
    acceptor: TlsAcceptor,
    shutdown: F,
    drain_timeout: Duration,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let graceful = GracefulShutdown::new();

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let acceptor = acceptor.clone();
        let app = app.clone();
        let watcher = graceful.watcher();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(%peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                app.clone().call(request)
            });

            let builder = auto::Builder::new(TokioExecutor::new());
            let connection = builder.serve_connection(TokioIo::new(stream), service);

            if let Err(e) = watcher.watch(connection).await {
                debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }

    drop(listener);
    info!("Waiting for in-flight requests to complete");

    tokio::select! {
        _ = graceful.shutdown() => {
            debug!("all connections closed");
        },
        _ = tokio::time::sleep(drain_timeout) => {
            warn!(timeout_secs = drain_timeout.as_secs(), "timed out draining connections");
        },
    }
}

/// Wait for shutdown signal
///
/// Listens for:
/// - SIGTERM (kubelet during Pod termination)
/// - SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

/// Builder for creating a server with custom configuration
pub struct ServerBuilder {
    config: ServerConfig,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    state: Option<Arc<AppState>>,
}

impl ServerBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            cert: None,
            key: None,
            state: None,
        }
    }

    /// Set the host to bind to
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port to listen on
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the request timeout in seconds
    pub fn request_timeout(mut self, timeout: u64) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the maximum request body size in bytes
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }

    /// Set the serving certificate path
    pub fn cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert = Some(path.into());
        self
    }

    /// Set the serving private key path
    pub fn key(mut self, path: impl Into<PathBuf>) -> Self {
        self.key = Some(path.into());
        self
    }

    /// Set the application state
    pub fn state(mut self, state: Arc<AppState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let state = self.state.context("Application state is required")?;

        let mut config = self.config;
        config.tls = match (self.cert, self.key) {
            (Some(cert), Some(key)) => Some(TlsPaths { cert, key }),
            (None, None) => None,
            (Some(_), None) => bail!("--cert was given without --key"),
            (None, Some(_)) => bail!("--key was given without --cert"),
        };

        Ok(Server::new(config, state))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
