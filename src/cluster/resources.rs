//! Cluster resource definitions
//!
//! Typed subsets of the OpenShift configuration and operator resources the
//! scenarios read and write. Fields not listed here are ignored on read.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::observed::FieldError;
use crate::models::{ObservedConfig, OperatorCondition, TlsSecurityProfile};

/// Cluster-wide API server configuration (`apiservers.config.openshift.io`)
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "APIServer",
    plural = "apiservers",
    root = "ApiServer"
)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerSpec {
    /// TLS security profile served by cluster components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_security_profile: Option<TlsSecurityProfile>,
}

/// Operator status reported to the cluster (`clusteroperators.config.openshift.io`)
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "ClusterOperator",
    plural = "clusteroperators",
    status = "ClusterOperatorStatus"
)]
pub struct ClusterOperatorSpec {}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperatorStatus {
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,

    #[serde(default)]
    pub versions: Vec<OperandVersion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
pub struct OperandVersion {
    pub name: String,
    pub version: String,
}

impl ClusterOperator {
    /// Reported conditions; empty while status is unset
    pub fn conditions(&self) -> &[OperatorCondition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

/// Controller manager operator configuration (`openshiftcontrollermanagers.operator.openshift.io`)
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "OpenShiftControllerManager",
    plural = "openshiftcontrollermanagers",
    status = "OpenShiftControllerManagerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftControllerManagerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_state: Option<String>,

    /// Configuration the operator observed and applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_config: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftControllerManagerStatus {
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl OpenShiftControllerManager {
    pub fn observed_config(&self) -> Result<ObservedConfig, FieldError> {
        ObservedConfig::from_value(self.spec.observed_config.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;
    use serde_json::json;

    #[test]
    fn test_resource_identity() {
        assert_eq!(ApiServer::kind(&()), "APIServer");
        assert_eq!(ApiServer::plural(&()), "apiservers");
        assert_eq!(ClusterOperator::group(&()), "config.openshift.io");
        assert_eq!(
            OpenShiftControllerManager::plural(&()),
            "openshiftcontrollermanagers"
        );
    }

    #[test]
    fn test_api_server_ignores_unmodelled_fields() {
        let api_server: ApiServer = serde_json::from_value(json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "APIServer",
            "metadata": {"name": "cluster"},
            "spec": {
                "audit": {"profile": "Default"},
                "tlsSecurityProfile": {"type": "Intermediate", "intermediate": {}}
            }
        }))
        .unwrap();

        assert_eq!(
            api_server.spec.tls_security_profile,
            Some(TlsSecurityProfile::intermediate())
        );
    }

    #[test]
    fn test_cluster_operator_without_status() {
        let co = ClusterOperator::new("openshift-controller-manager", ClusterOperatorSpec {});
        assert!(co.conditions().is_empty());
    }

    #[test]
    fn test_observed_config_accessor() {
        let ocm: OpenShiftControllerManager = serde_json::from_value(json!({
            "apiVersion": "operator.openshift.io/v1",
            "kind": "OpenShiftControllerManager",
            "metadata": {"name": "cluster"},
            "spec": {
                "managementState": "Managed",
                "observedConfig": {"servingInfo": {"minTLSVersion": "VersionTLS12"}}
            }
        }))
        .unwrap();

        let observed = ocm.observed_config().unwrap();
        let serving = observed.serving_info().unwrap().unwrap();
        assert_eq!(serving.min_tls_version.as_deref(), Some("VersionTLS12"));
    }
}
