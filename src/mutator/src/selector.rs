//! Node selector parsing from namespace annotations
//!
//! The annotation value is a flattened selector: `key=value` pairs separated
//! by commas, e.g. `disk=ssd,zone=a`. Fragments that do not split into exactly
//! one key and one value are dropped. Empty fragments, as left by a
//! trailing comma, are skipped without being reported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation used to declare where Pods in a namespace should be scheduled
pub const ANNOTATION: &str = "k8s-mutate-nodeselector.skpr.io/namespace";

const ENTRY_SEPARATOR: char = ',';
const PAIR_SEPARATOR: char = '=';

/// Node selector derived from a namespace annotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSelector(BTreeMap<String, String>);

impl NodeSelector {
    /// Parse a flattened selector, discarding malformed fragments
    pub fn parse(raw: &str) -> Self {
        parse_annotation(raw).selector
    }

    /// Selector for a namespace's annotation set; empty if the annotation is absent
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Self {
        annotations
            .get(ANNOTATION)
            .map(|raw| Self::parse(raw))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K, V> FromIterator<(K, V)> for NodeSelector
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Result of parsing an annotation value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSelector<'a> {
    /// Well-formed pairs; later duplicates overwrite earlier ones
    pub selector: NodeSelector,
    /// Non-empty fragments that were not exactly `key=value`
    pub dropped: Vec<&'a str>,
}

/// Parse a flattened selector, keeping track of dropped fragments
pub fn parse_annotation(raw: &str) -> ParsedSelector<'_> {
    let mut parsed = ParsedSelector::default();

    for fragment in raw.split(ENTRY_SEPARATOR) {
        let mut parts = fragment.split(PAIR_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                parsed.selector.0.insert(key.to_string(), value.to_string());
            }
            _ if fragment.is_empty() => {}
            _ => parsed.dropped.push(fragment),
        }
    }

    parsed
}
