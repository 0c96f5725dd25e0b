//! Kubernetes client wrapper
//!
//! Provides the cluster read/write contract on top of `kube`.

use anyhow::{Context, Result};
use kube::{
    api::{Api, Patch, PatchParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::path::Path;
use tracing::{debug, info};

use super::resources::{ApiServer, ClusterOperator, OpenShiftControllerManager};
use super::{tls_profile_patch, ClusterApi};
use crate::models::TlsSecurityProfile;

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a client from the default kubeconfig chain (KUBECONFIG, ~/.kube/config, in-cluster)
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        Ok(Self { client })
    }

    /// Create a client from an explicit kubeconfig file
    pub async fn from_kubeconfig(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig: {}", path.display()))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to load kubeconfig: {}", path.display()))?;

        Self::with_config(config)
    }

    /// Create client with custom config
    pub fn with_config(config: Config) -> Result<Self> {
        let client =
            Client::try_from(config).context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    /// Connect using `kubeconfig` when given, the default chain otherwise
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let client = match kubeconfig {
            Some(path) => Self::from_kubeconfig(path).await?,
            None => Self::new().await?,
        };
        info!("Connected to cluster");
        Ok(client)
    }

    /// Create a cluster-wide API for a custom resource type
    pub fn cluster_api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::ClusterResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }
}

impl ClusterApi for K8sClient {
    async fn api_server(&self, name: &str) -> Result<ApiServer> {
        self.cluster_api::<ApiServer>()
            .get(name)
            .await
            .with_context(|| format!("Failed to get APIServer {name}"))
    }

    async fn update_tls_profile(
        &self,
        name: &str,
        profile: Option<&TlsSecurityProfile>,
    ) -> Result<()> {
        let patch = tls_profile_patch(profile)?;
        debug!("Patching APIServer {}: {}", name, patch);

        self.cluster_api::<ApiServer>()
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("Failed to update TLS profile of APIServer {name}"))?;

        Ok(())
    }

    async fn cluster_operator(&self, name: &str) -> Result<ClusterOperator> {
        self.cluster_api::<ClusterOperator>()
            .get(name)
            .await
            .with_context(|| format!("Failed to get ClusterOperator {name}"))
    }

    async fn controller_manager(&self, name: &str) -> Result<OpenShiftControllerManager> {
        self.cluster_api::<OpenShiftControllerManager>()
            .get(name)
            .await
            .with_context(|| format!("Failed to get OpenShiftControllerManager {name}"))
    }
}
