//! Admission decision handler
//!
//! Resolves the node selector declared on a Pod's namespace and answers the
//! AdmissionReview with a JSON Patch that sets `/spec/nodeSelector`. The Pod
//! is always admitted; requests are either patched or passed through.

use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{LookupError, MutateError, Result};
use crate::lookup::ScopeLookup;
use crate::metrics::{AdmissionMetrics, Outcome};
use crate::patch::node_selector_patch;
use crate::selector::NodeSelector;
use crate::types::{AdmissionRequest, AdmissionResponse, AdmissionReview};

/// Handler for mutating admission requests
#[derive(Clone)]
pub struct Handler {
    lookup: Arc<dyn ScopeLookup>,
    metrics: Arc<AdmissionMetrics>,
}

impl Handler {
    pub fn new(lookup: Arc<dyn ScopeLookup>, metrics: Arc<AdmissionMetrics>) -> Self {
        Self { lookup, metrics }
    }

    pub fn metrics(&self) -> &Arc<AdmissionMetrics> {
        &self.metrics
    }

    /// Decide on a raw AdmissionReview body, returning the encoded reply
    pub async fn decide(&self, body: &[u8]) -> Result<Vec<u8>> {
        info!("received webhook mutate request");

        let result = async {
            let review = AdmissionReview::from_slice(body)?;
            let reply = self.review(review).await?;
            let encoded = serde_json::to_vec(&reply).map_err(MutateError::EncodeResponse)?;
            Ok::<_, MutateError>((reply.is_patched(), encoded))
        }
        .await;

        match result {
            Ok((patched, encoded)) => {
                self.metrics.record_outcome(if patched {
                    Outcome::Patched
                } else {
                    Outcome::Allowed
                });
                info!(patched, "completed webhook mutate request");
                Ok(encoded)
            }
            Err(err) => {
                self.metrics.record_outcome(if err.is_client_error() {
                    Outcome::ClientError
                } else {
                    Outcome::ServerError
                });
                Err(err)
            }
        }
    }

    /// Decide on a decoded AdmissionReview
    pub async fn review(&self, review: AdmissionReview) -> Result<AdmissionReview> {
        let request = review.request.as_ref().ok_or(MutateError::MissingRequest)?;

        let pod: Pod =
            serde_json::from_value(request.object.clone()).map_err(MutateError::MalformedObject)?;
        let namespace = pod_namespace(&pod, request);

        let node_selector = self.node_selector(namespace).await?;

        if node_selector.is_empty() {
            debug!(uid = %request.uid, namespace, "no node selector declared");
            return Ok(review.respond(AdmissionResponse::allow(request.uid.clone())));
        }

        let patch = node_selector_patch(&node_selector)?;

        info!(
            uid = %request.uid,
            namespace,
            selector = ?node_selector.as_map(),
            "patching node selector"
        );

        Ok(review.respond(AdmissionResponse::allow(request.uid.clone()).with_patch(patch)))
    }

    /// Node selector declared on a namespace
    ///
    /// An absent or malformed annotation yields an empty selector; only the
    /// lookup itself can fail.
    pub async fn node_selector(&self, namespace: &str) -> std::result::Result<NodeSelector, LookupError> {
        let start = Instant::now();
        let scope = self.lookup.get(namespace).await;
        self.metrics.record_lookup(start.elapsed());

        let scope = scope.map_err(|err| {
            warn!(namespace, error = %err, "namespace lookup failed");
            err
        })?;

        let parsed = scope.parsed_selector();
        if !parsed.dropped.is_empty() {
            debug!(
                namespace,
                dropped = ?parsed.dropped,
                "ignoring malformed node selector fragments"
            );
            self.metrics.record_dropped_fragments(parsed.dropped.len());
        }

        Ok(parsed.selector)
    }
}

/// Namespace the Pod is admitted into
///
/// Pods submitted without `metadata.namespace` take the request's namespace.
fn pod_namespace<'a>(pod: &'a Pod, request: &'a AdmissionRequest) -> &'a str {
    pod.metadata
        .namespace
        .as_deref()
        .filter(|ns| !ns.is_empty())
        .or(request.namespace.as_deref())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{InMemoryScopeLookup, ScopeConfig};
    use crate::selector::ANNOTATION;
    use crate::types::GroupVersionKind;
    use serde_json::json;

    fn handler(lookup: InMemoryScopeLookup) -> Handler {
        Handler::new(Arc::new(lookup), Arc::new(AdmissionMetrics::new().unwrap()))
    }

    fn pod_object(namespace: Option<&str>) -> serde_json::Value {
        let mut metadata = json!({ "name": "test" });
        if let Some(ns) = namespace {
            metadata["namespace"] = json!(ns);
        }
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": metadata,
            "spec": { "containers": [{ "name": "app", "image": "nginx" }] }
        })
    }

    fn request(object: serde_json::Value, namespace: Option<&str>) -> AdmissionRequest {
        AdmissionRequest {
            uid: "12345".to_string(),
            kind: GroupVersionKind::pod(),
            resource: None,
            namespace: namespace.map(str::to_string),
            operation: Some("CREATE".to_string()),
            object,
        }
    }

    #[test]
    fn test_pod_namespace_prefers_pod_metadata() {
        let pod: Pod = serde_json::from_value(pod_object(Some("from-pod"))).unwrap();
        let req = request(json!({}), Some("from-request"));
        assert_eq!(pod_namespace(&pod, &req), "from-pod");
    }

    #[test]
    fn test_pod_namespace_falls_back_to_request() {
        let pod: Pod = serde_json::from_value(pod_object(None)).unwrap();
        let req = request(json!({}), Some("from-request"));
        assert_eq!(pod_namespace(&pod, &req), "from-request");

        let req = request(json!({}), None);
        assert_eq!(pod_namespace(&pod, &req), "");
    }

    #[tokio::test]
    async fn test_review_patches_annotated_namespace() {
        let handler = handler(InMemoryScopeLookup::with_scopes([
            ScopeConfig::new("test").with_annotation(ANNOTATION, "foo=bar")
        ]));

        let reply = handler
            .review(AdmissionReview::from_request(request(pod_object(Some("test")), Some("default"))))
            .await
            .unwrap();

        let response = reply.response.unwrap();
        assert_eq!(response.uid, "12345");
        assert!(response.allowed);

        let patch: serde_json::Value = serde_json::from_slice(&response.patch.unwrap()).unwrap();
        assert_eq!(
            patch,
            json!([{ "op": "add", "path": "/spec/nodeSelector", "value": { "foo": "bar" } }])
        );
    }

    #[tokio::test]
    async fn test_review_without_annotation_allows_unchanged() {
        let handler = handler(InMemoryScopeLookup::with_scopes([ScopeConfig::new("test")]));

        let reply = handler
            .review(AdmissionReview::from_request(request(pod_object(Some("test")), None)))
            .await
            .unwrap();

        let response = reply.response.unwrap();
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
    }

    #[tokio::test]
    async fn test_review_missing_request() {
        let handler = handler(InMemoryScopeLookup::new());
        let review: AdmissionReview =
            serde_json::from_value(json!({ "apiVersion": "admission.k8s.io/v1" })).unwrap();

        let err = handler.review(review).await.unwrap_err();
        assert!(matches!(err, MutateError::MissingRequest));
    }

    #[tokio::test]
    async fn test_node_selector_counts_dropped_fragments() {
        let handler = handler(InMemoryScopeLookup::with_scopes([
            ScopeConfig::new("test").with_annotation(ANNOTATION, "a=1,bad,worse,c=3")
        ]));

        let selector = handler.node_selector("test").await.unwrap();
        assert_eq!(selector.len(), 2);
        assert_eq!(handler.metrics().dropped_fragments_total.get(), 2);
    }

    #[tokio::test]
    async fn test_node_selector_trailing_comma_drops_nothing() {
        let handler = handler(InMemoryScopeLookup::with_scopes([
            ScopeConfig::new("test").with_annotation(ANNOTATION, "disk=ssd,"),
            ScopeConfig::new("blank").with_annotation(ANNOTATION, ""),
        ]));

        let selector = handler.node_selector("test").await.unwrap();
        assert_eq!(selector.get("disk"), Some("ssd"));
        assert!(handler.node_selector("blank").await.unwrap().is_empty());
        assert_eq!(handler.metrics().dropped_fragments_total.get(), 0);
    }

    #[tokio::test]
    async fn test_decide_records_outcomes() {
        let handler = handler(InMemoryScopeLookup::with_scopes([ScopeConfig::new("test")]));

        let body =
            serde_json::to_vec(&AdmissionReview::from_request(request(pod_object(Some("test")), None)))
                .unwrap();
        handler.decide(&body).await.unwrap();
        assert!(handler.decide(b"{").await.is_err());

        assert_eq!(handler.metrics().outcome_count(Outcome::Allowed), 1);
        assert_eq!(handler.metrics().outcome_count(Outcome::ClientError), 1);
    }
}
