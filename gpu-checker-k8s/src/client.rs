//! Kubernetes Client wrapper
//!
//! Connects to the API server and lists cluster nodes.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use gpu_checker_core::NodeSource;

/// Kubernetes client wrapper
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a client from `KUBECONFIG`, `~/.kube/config` or in-cluster config
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        info!("Connected to Kubernetes API server");
        Ok(Self { client })
    }

    /// Create a client from an explicit kubeconfig file
    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig: {:?}", path))?;
        let config = config_from_kubeconfig(kubeconfig).await?;

        info!(kubeconfig = ?path, "Connected to Kubernetes API server");
        Self::with_config(config)
    }

    /// Create a client from an explicit kubeconfig path, or the default chain
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        match kubeconfig {
            Some(path) => Self::from_kubeconfig(path).await,
            None => Self::new().await,
        }
    }

    /// Create a new K8s client with custom config
    pub fn with_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config)
            .context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    /// Get node API
    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    /// List every node in the cluster
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .nodes()
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;

        debug!(count = nodes.items.len(), "Listed cluster nodes");
        Ok(nodes.items)
    }
}

#[async_trait]
impl NodeSource for K8sClient {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        K8sClient::list_nodes(self).await
    }
}

/// Build a client config from the kubeconfig's current context
async fn config_from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Config> {
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("Failed to load kubeconfig")
}
