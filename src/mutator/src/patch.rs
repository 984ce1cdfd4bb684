//! JSON Patch (RFC 6902) construction

use serde::Serialize;

use crate::error::{MutateError, Result};
use crate::selector::NodeSelector;

/// Pod field holding the node selector
pub const NODE_SELECTOR_PATH: &str = "/spec/nodeSelector";

/// A single JSON Patch operation
#[derive(Debug, Serialize)]
pub struct PatchOperation<'a, T: Serialize> {
    pub op: &'static str,
    pub path: &'a str,
    pub value: T,
}

impl<'a, T: Serialize> PatchOperation<'a, T> {
    /// Add `value` at `path`, replacing anything already there
    pub fn add(path: &'a str, value: T) -> Self {
        Self {
            op: "add",
            path,
            value,
        }
    }
}

/// Encode a patch that sets the Pod's node selector wholesale
pub fn node_selector_patch(selector: &NodeSelector) -> Result<Vec<u8>> {
    serde_json::to_vec(&[PatchOperation::add(NODE_SELECTOR_PATH, selector)])
        .map_err(MutateError::Patch)
}
