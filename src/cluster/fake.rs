//! Scripted in-memory cluster for tests
//!
//! Simulates an operator that takes a configurable number of status reads to
//! reconcile a TLS profile change before publishing it in its observed
//! config. APIServer writes are applied with JSON merge patch semantics,
//! like the API server does.

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};
use std::sync::Mutex;

use super::resources::{
    ApiServer, ApiServerSpec, ClusterOperator, ClusterOperatorSpec, ClusterOperatorStatus,
    OpenShiftControllerManager, OpenShiftControllerManagerSpec,
};
use super::{tls_profile_patch, ClusterApi};
use crate::models::conditions::{OPERATOR_AVAILABLE, OPERATOR_DEGRADED, OPERATOR_PROGRESSING};
use crate::models::tls::{MODERN_CIPHERS, VERSION_TLS12, VERSION_TLS13};
use crate::models::{ConditionStatus, OperatorCondition, TlsSecurityProfile};

const INTERMEDIATE_CIPHERS: [&str; 5] = [
    "TLS_AES_128_GCM_SHA256",
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
    "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
    "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
];

#[derive(Debug, Default)]
struct FakeState {
    /// Stored APIServer object, as JSON
    api_server: Value,
    /// Profile reflected in the observed config
    applied: Option<TlsSecurityProfile>,
    /// Operator reads left before the pending change is applied
    reconcile_remaining: u32,
    reconcile_reads: u32,
    never_reconcile: bool,
    degraded: bool,
    status_unset_reads: u32,
    operator_read_failures: u32,
    api_server_unavailable: bool,
    updates: Vec<Option<TlsSecurityProfile>>,
    operator_reads: u32,
}

/// In-memory [`ClusterApi`] implementation
#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit APIServer profile that is already applied
    pub fn with_profile(self, profile: TlsSecurityProfile) -> Self {
        {
            let mut state = self.lock();
            state.api_server = json!({ "spec": { "tlsSecurityProfile": &profile } });
            state.applied = Some(profile);
        }
        self
    }

    /// Number of operator reads reporting Progressing after each update
    pub fn with_reconcile_reads(self, reads: u32) -> Self {
        self.lock().reconcile_reads = reads;
        self
    }

    pub fn never_reconcile(self) -> Self {
        self.lock().never_reconcile = true;
        self
    }

    pub fn degraded(self) -> Self {
        self.lock().degraded = true;
        self
    }

    /// Number of initial operator reads returning an operator with no status
    pub fn with_status_unset_reads(self, reads: u32) -> Self {
        self.lock().status_unset_reads = reads;
        self
    }

    /// Number of initial operator reads that fail
    pub fn with_operator_read_failures(self, failures: u32) -> Self {
        self.lock().operator_read_failures = failures;
        self
    }

    pub fn api_server_unavailable(self) -> Self {
        self.lock().api_server_unavailable = true;
        self
    }

    /// Every profile written, in order
    pub fn updates(&self) -> Vec<Option<TlsSecurityProfile>> {
        self.lock().updates.clone()
    }

    pub fn desired_profile(&self) -> Option<TlsSecurityProfile> {
        self.lock().desired()
    }

    pub fn operator_reads(&self) -> u32 {
        self.lock().operator_reads
    }

    /// Stored `spec.tlsSecurityProfile`, exactly as a client would read it
    pub fn raw_profile(&self) -> Value {
        self.lock().api_server["spec"]["tlsSecurityProfile"].clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn observed_config(applied: Option<&TlsSecurityProfile>) -> Value {
        let (version, ciphers): (&str, Vec<&str>) = match applied.and_then(|p| p.min_tls_version()) {
            Some(version) if version == VERSION_TLS13 => {
                let mut ciphers = MODERN_CIPHERS.to_vec();
                ciphers.push("TLS_AES_128_CCM_SHA256");
                (version, ciphers)
            }
            Some(version) => (version, INTERMEDIATE_CIPHERS.to_vec()),
            None => (VERSION_TLS12, INTERMEDIATE_CIPHERS.to_vec()),
        };

        json!({
            "build": {"buildDefaults": {"resources": {}}},
            "servingInfo": {"minTLSVersion": version, "cipherSuites": ciphers}
        })
    }
}

impl FakeState {
    fn desired(&self) -> Option<TlsSecurityProfile> {
        let raw = self.api_server["spec"]["tlsSecurityProfile"].clone();
        serde_json::from_value(raw).unwrap_or_default()
    }
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Value::Object(map) = target {
        for (key, value) in entries {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.as_str()).or_insert(Value::Null), value);
            }
        }
    }
}

impl ClusterApi for FakeCluster {
    async fn api_server(&self, name: &str) -> Result<ApiServer> {
        let state = self.lock();
        if state.api_server_unavailable {
            bail!("apiservers.config.openshift.io \"{name}\" is forbidden");
        }

        Ok(ApiServer::new(
            name,
            ApiServerSpec {
                tls_security_profile: state.desired(),
            },
        ))
    }

    async fn update_tls_profile(
        &self,
        _name: &str,
        profile: Option<&TlsSecurityProfile>,
    ) -> Result<()> {
        let mut state = self.lock();
        if state.api_server_unavailable {
            bail!("apiserver update rejected");
        }

        let patch = tls_profile_patch(profile)?;
        merge_patch(&mut state.api_server, &patch);
        state.updates.push(profile.cloned());
        state.reconcile_remaining = state.reconcile_reads;
        if state.reconcile_remaining == 0 && !state.never_reconcile {
            state.applied = state.desired();
        }
        Ok(())
    }

    async fn cluster_operator(&self, name: &str) -> Result<ClusterOperator> {
        let mut state = self.lock();
        state.operator_reads += 1;

        if state.operator_read_failures > 0 {
            state.operator_read_failures -= 1;
            return Err(anyhow!("connection reset by peer"));
        }

        let mut co = ClusterOperator::new(name, ClusterOperatorSpec {});
        if state.status_unset_reads > 0 {
            state.status_unset_reads -= 1;
            return Ok(co);
        }

        let progressing = if state.never_reconcile && state.desired() != state.applied {
            true
        } else if state.reconcile_remaining > 0 {
            state.reconcile_remaining -= 1;
            if state.reconcile_remaining == 0 {
                state.applied = state.desired();
            }
            true
        } else {
            false
        };

        let flag = |on: bool| {
            if on {
                ConditionStatus::True
            } else {
                ConditionStatus::False
            }
        };

        co.status = Some(ClusterOperatorStatus {
            conditions: vec![
                OperatorCondition::new(OPERATOR_AVAILABLE, ConditionStatus::True),
                OperatorCondition::new(OPERATOR_PROGRESSING, flag(progressing))
                    .with_reason("ObservedConfigChanged"),
                OperatorCondition::new(OPERATOR_DEGRADED, flag(state.degraded)),
            ],
            versions: Vec::new(),
        });
        Ok(co)
    }

    async fn controller_manager(&self, name: &str) -> Result<OpenShiftControllerManager> {
        let state = self.lock();
        Ok(OpenShiftControllerManager::new(
            name,
            OpenShiftControllerManagerSpec {
                management_state: Some("Managed".to_string()),
                observed_config: Some(Self::observed_config(state.applied.as_ref())),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_patch_semantics() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        merge_patch(&mut target, &json!({"a": {"b": null, "e": 3}, "d": [3]}));
        assert_eq!(target, json!({"a": {"c": 2, "e": 3}, "d": [3]}));
    }

    #[tokio::test]
    async fn test_profile_switch_leaves_no_stale_member() {
        let cluster = FakeCluster::new().with_profile(TlsSecurityProfile::old());

        cluster
            .update_tls_profile("cluster", Some(&TlsSecurityProfile::modern()))
            .await
            .unwrap();
        assert_eq!(cluster.raw_profile(), json!({"type": "Modern", "modern": {}}));

        cluster
            .update_tls_profile("cluster", Some(&TlsSecurityProfile::old()))
            .await
            .unwrap();
        assert_eq!(cluster.raw_profile(), json!({"type": "Old", "old": {}}));

        cluster.update_tls_profile("cluster", None).await.unwrap();
        assert_eq!(cluster.raw_profile(), Value::Null);
        assert_eq!(cluster.desired_profile(), None);
    }
}
