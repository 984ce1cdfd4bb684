// Webhook server for node selector mutation
// Serves AdmissionReview requests from the Kubernetes API server

pub mod error;
pub mod handlers;
pub mod kube_lookup;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod tls;

pub use error::{ApiError, Result, TlsError};
pub use kube_lookup::KubeNamespaceLookup;
pub use server::{Server, ServerBuilder, ServerConfig};
pub use state::AppState;

/// Health check response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
