//! Namespace lookup used to resolve a Pod's node selector

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::LookupError;
use crate::selector::{parse_annotation, NodeSelector, ParsedSelector, ANNOTATION};

/// Namespace metadata relevant to admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Namespace name
    pub name: String,

    /// Namespace annotations
    pub annotations: BTreeMap<String, String>,
}

impl ScopeConfig {
    /// Create a namespace with no annotations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: BTreeMap::new(),
        }
    }

    /// Add an annotation to the namespace
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Parse the node selector annotation, if any
    pub fn parsed_selector(&self) -> ParsedSelector<'_> {
        self.annotations
            .get(ANNOTATION)
            .map(|raw| parse_annotation(raw))
            .unwrap_or_default()
    }

    /// Node selector declared on this namespace
    pub fn node_selector(&self) -> NodeSelector {
        NodeSelector::from_annotations(&self.annotations)
    }
}

/// Read-only namespace lookup
#[async_trait]
pub trait ScopeLookup: Send + Sync {
    /// Fetch a namespace by name
    async fn get(&self, name: &str) -> Result<ScopeConfig, LookupError>;
}

/// In-memory namespace lookup
#[derive(Clone, Default)]
pub struct InMemoryScopeLookup {
    scopes: Arc<RwLock<HashMap<String, ScopeConfig>>>,
}

impl InMemoryScopeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lookup pre-populated with the given namespaces
    pub fn with_scopes(scopes: impl IntoIterator<Item = ScopeConfig>) -> Self {
        let scopes = scopes
            .into_iter()
            .map(|scope| (scope.name.clone(), scope))
            .collect();

        Self {
            scopes: Arc::new(RwLock::new(scopes)),
        }
    }

    /// Insert or replace a namespace
    pub async fn insert(&self, scope: ScopeConfig) {
        let mut scopes = self.scopes.write().await;
        scopes.insert(scope.name.clone(), scope);
    }

    /// Remove a namespace
    pub async fn remove(&self, name: &str) -> Option<ScopeConfig> {
        let mut scopes = self.scopes.write().await;
        scopes.remove(name)
    }
}

#[async_trait]
impl ScopeLookup for InMemoryScopeLookup {
    async fn get(&self, name: &str) -> Result<ScopeConfig, LookupError> {
        let scopes = self.scopes.read().await;
        scopes
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }
}
