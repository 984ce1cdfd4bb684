//! Node selector mutating webhook
//!
//! Injects `spec.nodeSelector` into Pods based on the
//! `k8s-mutate-nodeselector.skpr.io/namespace` annotation of their namespace.
//!
//! # Usage
//!
//! ```bash
//! # Using flags
//! k8s-mutate-nodeselector --cert=/path/to/my/certificate --key=/path/to/my/key
//!
//! # Using environment variables
//! export K8S_MUTATE_NODESELECTOR_CERT=/path/to/my/certificate
//! export K8S_MUTATE_NODESELECTOR_KEY=/path/to/my/key
//! k8s-mutate-nodeselector
//!
//! # Enable debug logging
//! RUST_LOG=debug k8s-mutate-nodeselector
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook::{kube_lookup, server::ServerBuilder, state::AppState, KubeNamespaceLookup};

/// Run the mutating webhook server
#[derive(Parser, Debug)]
#[command(
    name = "k8s-mutate-nodeselector",
    version,
    about = "Run the mutating webhook server",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "K8S_MUTATE_NODESELECTOR_HOST")]
    host: String,

    /// Port which this webserver will receive requests
    #[arg(short = 'p', long, default_value = "8443", env = "K8S_MUTATE_NODESELECTOR_PORT")]
    port: u16,

    /// Path to the kubeconfig file
    #[arg(long, env = "K8S_MUTATE_NODESELECTOR_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Path to the certificate file
    #[arg(long, env = "K8S_MUTATE_NODESELECTOR_CERT")]
    cert: Option<PathBuf>,

    /// Path to the key file
    #[arg(long, env = "K8S_MUTATE_NODESELECTOR_KEY")]
    key: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value = "10", env = "K8S_MUTATE_NODESELECTOR_REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Maximum request body size in bytes
    #[arg(long, default_value = "1048576", env = "K8S_MUTATE_NODESELECTOR_MAX_BODY_BYTES")]
    max_body_bytes: usize,

    /// Enable JSON logging format
    #[arg(long, env = "K8S_MUTATE_NODESELECTOR_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting server");

    // kube and the TLS listener share one process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let client = kube_lookup::create_client(non_empty(&args.kubeconfig)).await?;
    let lookup = Arc::new(KubeNamespaceLookup::new(client));

    let state = AppState::with_lookup(lookup).context("failed to register metrics")?;

    let mut builder = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .request_timeout(args.request_timeout)
        .max_body_bytes(args.max_body_bytes)
        .state(Arc::new(state));

    if let Some(cert) = non_empty(&args.cert) {
        builder = builder.cert(cert);
    }
    if let Some(key) = non_empty(&args.key) {
        builder = builder.key(key);
    }

    let server = builder.build()?;

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Treat empty flag or env values as unset
fn non_empty(path: &Option<PathBuf>) -> Option<&std::path::Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

/// Initialize tracing/logging subsystem
fn init_tracing(args: &Args) {
    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        tracing_subscriber::EnvFilter::new("info")
    });

    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
