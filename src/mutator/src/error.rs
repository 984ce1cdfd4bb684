//! Error types for the admission decision pipeline

use thiserror::Error;

/// Scope lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    /// The named scope does not exist
    #[error("namespace not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached or answered with an error
    #[error("namespace lookup failed: {0}")]
    Unavailable(String),
}

/// Admission decision errors
#[derive(Debug, Error)]
pub enum MutateError {
    /// Request body is not a valid AdmissionReview
    #[error("failed to decode admission review: {0}")]
    MalformedReview(#[source] serde_json::Error),

    /// AdmissionReview carried no request
    #[error("failed to decode admission review: missing request")]
    MissingRequest,

    /// Embedded object is not a valid Pod
    #[error("failed to unmarshal pod: {0}")]
    MalformedObject(#[source] serde_json::Error),

    /// The Pod's namespace could not be resolved
    #[error("failed to get node selector: {0}")]
    Lookup(#[from] LookupError),

    /// JSON Patch could not be serialized
    #[error("failed to create patch: {0}")]
    Patch(#[source] serde_json::Error),

    /// Response envelope could not be serialized
    #[error("failed to encode admission review response: {0}")]
    EncodeResponse(#[source] serde_json::Error),
}

impl MutateError {
    /// Whether the failure is caused by the caller's input.
    ///
    /// Lookup failures count as client errors, whether the namespace is
    /// missing or the API server is unreachable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MutateError::MalformedReview(_)
                | MutateError::MissingRequest
                | MutateError::MalformedObject(_)
                | MutateError::Lookup(_)
        )
    }
}

/// Result type for admission operations
pub type Result<T> = std::result::Result<T, MutateError>;
