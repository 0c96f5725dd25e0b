//! Cluster access
//!
//! The scenarios depend on the cluster only through [`ClusterApi`]: typed
//! reads of the resources they observe and a single write of the desired
//! TLS profile.

mod client;
#[cfg(test)]
pub mod fake;
pub mod resources;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::future::Future;

pub use client::K8sClient;
pub use resources::{ApiServer, ClusterOperator, OpenShiftControllerManager};

use crate::models::TlsSecurityProfile;

/// Read/write contract used by the scenarios
pub trait ClusterApi: Send + Sync {
    fn api_server(&self, name: &str) -> impl Future<Output = Result<ApiServer>> + Send;

    /// Set or, with `None`, clear the APIServer TLS security profile
    fn update_tls_profile(
        &self,
        name: &str,
        profile: Option<&TlsSecurityProfile>,
    ) -> impl Future<Output = Result<()>> + Send;

    fn cluster_operator(&self, name: &str) -> impl Future<Output = Result<ClusterOperator>> + Send;

    fn controller_manager(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<OpenShiftControllerManager>> + Send;
}

/// APIServer merge patch that sets, or with `None` removes, the TLS profile
///
/// Fields of the spec other than the profile are left untouched.
pub fn tls_profile_patch(profile: Option<&TlsSecurityProfile>) -> Result<Value> {
    let profile = profile
        .map(TlsSecurityProfile::to_merge_patch)
        .transpose()
        .context("Failed to encode TLS profile")?;
    Ok(json!({ "spec": { "tlsSecurityProfile": profile } }))
}
