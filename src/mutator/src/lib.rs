//! Node selector mutation for Kubernetes admission
//!
//! Decides on `AdmissionReview` requests for Pods: the node selector declared
//! on the Pod's namespace, via the `k8s-mutate-nodeselector.skpr.io/namespace`
//! annotation, is injected into `/spec/nodeSelector` with a JSON Patch.
//! Requests are always allowed.
//!
//! # Example
//!
//! ```
//! use mutate_nodeselector::{AdmissionMetrics, Handler, InMemoryScopeLookup, ScopeConfig, ANNOTATION};
//! use std::sync::Arc;
//!
//! let lookup = InMemoryScopeLookup::with_scopes([
//!     ScopeConfig::new("ns1").with_annotation(ANNOTATION, "disk=ssd"),
//! ]);
//! let metrics = Arc::new(AdmissionMetrics::new().unwrap());
//! let handler = Handler::new(Arc::new(lookup), metrics);
//! # let _ = handler;
//! ```

pub mod error;
pub mod handler;
pub mod lookup;
pub mod metrics;
pub mod patch;
pub mod selector;
pub mod types;

pub use error::{LookupError, MutateError, Result};
pub use handler::Handler;
pub use lookup::{InMemoryScopeLookup, ScopeConfig, ScopeLookup};
pub use metrics::{AdmissionMetrics, Outcome};
pub use patch::NODE_SELECTOR_PATH;
pub use selector::{parse_annotation, NodeSelector, ParsedSelector, ANNOTATION};
pub use types::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, GroupVersionKind,
    GroupVersionResource, PatchType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
