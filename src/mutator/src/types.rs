//! AdmissionReview wire types (admission.k8s.io/v1)

use serde::{Deserialize, Serialize};

use crate::error::{MutateError, Result};

/// Default AdmissionReview API version
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

/// Default AdmissionReview kind
pub const ADMISSION_KIND: &str = "AdmissionReview";

fn default_api_version() -> String {
    ADMISSION_API_VERSION.to_string()
}

fn default_kind() -> String {
    ADMISSION_KIND.to_string()
}

/// Group/version/kind of the object under review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

impl GroupVersionKind {
    /// Core v1 Pod
    pub fn pod() -> Self {
        Self {
            group: String::new(),
            version: "v1".to_string(),
            kind: "Pod".to_string(),
        }
    }
}

/// Group/version/resource of the object under review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
}

/// AdmissionReview envelope, used for both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// Wrap a request in a v1 envelope
    pub fn from_request(request: AdmissionRequest) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: Some(request),
            response: None,
        }
    }

    /// Decode an envelope from a request body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(MutateError::MalformedReview)
    }

    /// Build the reply envelope, echoing this review's apiVersion and kind
    pub fn respond(&self, response: AdmissionResponse) -> AdmissionReview {
        AdmissionReview {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            request: None,
            response: Some(response),
        }
    }

    /// Whether this review carries a patched response
    pub fn is_patched(&self) -> bool {
        self.response
            .as_ref()
            .map(|r| r.patch.is_some())
            .unwrap_or(false)
    }
}

/// Admission request sent by the API server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,

    #[serde(default)]
    pub kind: GroupVersionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<GroupVersionResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Serialized workload object, decoded separately
    #[serde(default)]
    pub object: serde_json::Value,
}

/// Patch encoding understood by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

/// Admission response returned to the API server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,

    pub allowed: bool,

    /// Raw JSON Patch bytes; base64 on the wire
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub patch: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,
}

impl AdmissionResponse {
    /// Allow the request unchanged
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
            patch_type: None,
        }
    }

    /// Attach a JSON Patch to the response
    pub fn with_patch(mut self, patch: Vec<u8>) -> Self {
        self.patch = Some(patch);
        self.patch_type = Some(PatchType::JsonPatch);
        self
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults_envelope_identity() {
        let review: AdmissionReview = serde_json::from_value(json!({
            "request": { "uid": "abc", "object": {} }
        }))
        .unwrap();

        assert_eq!(review.api_version, ADMISSION_API_VERSION);
        assert_eq!(review.kind, ADMISSION_KIND);
        assert_eq!(review.request.unwrap().uid, "abc");
    }

    #[test]
    fn test_respond_echoes_envelope_identity() {
        let review: AdmissionReview = serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1beta1",
            "kind": "AdmissionReview",
            "request": { "uid": "abc", "object": {} }
        }))
        .unwrap();

        let reply = review.respond(AdmissionResponse::allow("abc"));
        assert_eq!(reply.api_version, "admission.k8s.io/v1beta1");
        assert_eq!(reply.kind, "AdmissionReview");
        assert!(reply.request.is_none());
    }

    #[test]
    fn test_allow_response_omits_patch_fields() {
        let value = serde_json::to_value(AdmissionResponse::allow("abc")).unwrap();
        assert_eq!(value, json!({ "uid": "abc", "allowed": true }));
    }

    #[test]
    fn test_patch_is_base64_on_the_wire() {
        let response = AdmissionResponse::allow("abc").with_patch(b"[]".to_vec());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["patch"], "W10=");
        assert_eq!(value["patchType"], "JSONPatch");

        let decoded: AdmissionResponse = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.patch.as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_from_slice_rejects_garbage() {
        let err = AdmissionReview::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, MutateError::MalformedReview(_)));
    }
}
