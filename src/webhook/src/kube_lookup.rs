//! Namespace lookup backed by the Kubernetes API

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use mutate_nodeselector::{LookupError, ScopeConfig, ScopeLookup};
use std::path::Path;
use tracing::info;

/// Reads Namespace objects through the API server
#[derive(Clone)]
pub struct KubeNamespaceLookup {
    api: Api<Namespace>,
}

impl KubeNamespaceLookup {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ScopeLookup for KubeNamespaceLookup {
    async fn get(&self, name: &str) -> std::result::Result<ScopeConfig, LookupError> {
        match self.api.get(name).await {
            Ok(namespace) => Ok(scope_from_namespace(namespace)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(LookupError::NotFound(name.to_string())),
            Err(e) => Err(LookupError::Unavailable(e.to_string())),
        }
    }
}

/// Namespace metadata as seen by the admission handler
pub fn scope_from_namespace(namespace: Namespace) -> ScopeConfig {
    ScopeConfig {
        name: namespace.metadata.name.unwrap_or_default(),
        annotations: namespace.metadata.annotations.unwrap_or_default(),
    }
}

/// Build a client from an explicit kubeconfig, or infer in-cluster/local config
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            info!(path = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to load kubeconfig")?
        }
        None => Config::infer()
            .await
            .context("failed to infer Kubernetes configuration")?,
    };

    Client::try_from(config).context("failed to create Kubernetes client")
}
