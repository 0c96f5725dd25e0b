//! TLS security profile propagation scenario
//!
//! Switches the cluster APIServer to the Modern TLS profile, waits for the
//! operator to reconcile, and checks that the controller manager's observed
//! config serves TLS 1.3 with the Modern cipher suites. The original profile
//! is always restored afterwards; restore problems are logged, never failed.

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::operator_status::ensure_status_is_set;
use super::TestDeadline;
use crate::cluster::{ClusterApi, ClusterOperator, OpenShiftControllerManager};
use crate::config::{AppConfig, WaitConfig};
use crate::models::conditions::{find_condition, OPERATOR_PROGRESSING};
use crate::models::tls::{MODERN_CIPHERS, VERSION_TLS12, VERSION_TLS13};
use crate::models::{ConditionStatus, OperatorHealth, TlsSecurityProfile};
use crate::poll::{poll_until_converged, Check};

/// Converged once the operator reports Progressing=True
pub fn check_progressing_started(co: &ClusterOperator) -> Check {
    match find_condition(co.conditions(), OPERATOR_PROGRESSING) {
        Some(c) if c.status == ConditionStatus::True => {
            info!(
                "Operator is now progressing, reason: {}",
                c.reason.as_deref().unwrap_or("")
            );
            Check::Converged
        }
        Some(c) => Check::pending(format!("Progressing={}", c.status)),
        None => Check::pending("Progressing not reported"),
    }
}

/// Converged once the operator is available and done progressing
///
/// A degraded operator is reported but polling continues until the deadline.
pub fn check_reconciled(co: &ClusterOperator) -> Check {
    let health = OperatorHealth::from_conditions(co.conditions());
    if health.degraded {
        warn!("Operator is degraded");
        return Check::pending(format!("operator degraded ({health})"));
    }
    Check::when(health.is_settled(), || {
        format!("operator still reconciling ({health})")
    })
}

/// Converged once the observed serving config is TLS 1.3 with every Modern cipher
pub fn check_modern_observed(ocm: &OpenShiftControllerManager) -> Check {
    let observed = match ocm.observed_config() {
        Ok(observed) => observed,
        Err(e) => return Check::transient(e),
    };
    let serving = match observed.serving_info() {
        Ok(Some(serving)) => serving,
        Ok(None) => return Check::pending("servingInfo not found in observed config"),
        Err(e) => return Check::pending(format!("servingInfo unreadable: {e}")),
    };

    match serving.min_tls_version.as_deref() {
        Some(VERSION_TLS13) => {}
        Some(other) => {
            return Check::pending(format!(
                "minTLSVersion is {other}, expected {VERSION_TLS13}"
            ))
        }
        None => return Check::pending("minTLSVersion not set"),
    }

    if serving.cipher_suites.is_empty() {
        return Check::pending("cipherSuites not set");
    }

    let missing = serving.missing_ciphers(&MODERN_CIPHERS);
    if !missing.is_empty() {
        return Check::pending(format!(
            "cipher suites {:?} not observed yet, got {:?}",
            missing, serving.cipher_suites
        ));
    }

    info!(
        "Validated Modern TLS config: minTLSVersion={}, cipherSuites={:?}",
        VERSION_TLS13, serving.cipher_suites
    );
    Check::Converged
}

/// Converged once the observed config no longer reflects the Modern profile
///
/// Without an original profile the cluster default (TLS 1.2) or no explicit
/// version at all is accepted. With one, any version found other than TLS 1.3
/// is accepted, including an empty one.
pub fn check_restored(ocm: &OpenShiftControllerManager, had_original: bool) -> Check {
    let observed = match ocm.observed_config() {
        Ok(observed) => observed,
        Err(e) => return Check::transient(e),
    };
    let version = match observed.nested_string(&["servingInfo", "minTLSVersion"]) {
        Ok(version) => version,
        Err(e) => return Check::pending(format!("minTLSVersion unreadable: {e}")),
    };

    let restored = match (had_original, version) {
        (true, Some(v)) => v != VERSION_TLS13,
        (true, None) => false,
        (false, None | Some("") | Some(VERSION_TLS12)) => true,
        (false, Some(_)) => false,
    };

    if restored {
        info!(
            "TLS profile restored, minTLSVersion: {}",
            version.filter(|v| !v.is_empty()).unwrap_or("cluster default")
        );
    }
    Check::when(restored, || {
        format!(
            "waiting for TLS profile restoration, current: {}",
            version.unwrap_or("<unset>")
        )
    })
}

async fn wait_progressing<C: ClusterApi>(client: &C, config: &AppConfig) -> Result<()> {
    let name = config.operator_name.as_str();
    poll_until_converged(
        format!("ClusterOperator {name} to start progressing"),
        config.waits.progressing_start.poll_config(),
        || async move {
            match client.cluster_operator(name).await {
                Ok(co) => check_progressing_started(&co),
                Err(e) => Check::transient(e),
            }
        },
    )
    .await?;
    Ok(())
}

async fn wait_reconciled<C: ClusterApi>(
    client: &C,
    config: &AppConfig,
    wait: WaitConfig,
) -> Result<()> {
    let name = config.operator_name.as_str();
    poll_until_converged(
        format!("ClusterOperator {name} to finish reconciling"),
        wait.poll_config(),
        || async move {
            match client.cluster_operator(name).await {
                Ok(co) => check_reconciled(&co),
                Err(e) => Check::transient(e),
            }
        },
    )
    .await?;
    Ok(())
}

/// Restores the APIServer TLS profile captured before the change
#[derive(Clone, Debug)]
pub struct ProfileRestore {
    original: Option<TlsSecurityProfile>,
}

impl ProfileRestore {
    pub fn new(original: Option<TlsSecurityProfile>) -> Self {
        Self { original }
    }

    /// Restore and wait for propagation; every failure is logged only
    pub async fn run<C: ClusterApi>(self, client: &C, config: &AppConfig) {
        if let Err(e) = self.try_run(client, config).await {
            warn!("TLS profile restore incomplete: {:#}", e);
        }
    }

    async fn try_run<C: ClusterApi>(&self, client: &C, config: &AppConfig) -> Result<()> {
        let resource = config.resource_name.as_str();
        info!("Restoring original TLS profile");

        // Re-read so a concurrent writer does not go unnoticed
        client
            .api_server(resource)
            .await
            .context("Failed to get APIServer for cleanup")?;
        client
            .update_tls_profile(resource, self.original.as_ref())
            .await
            .context("Failed to restore original TLS profile")?;

        info!("Waiting for operator to reconcile TLS profile restoration");
        wait_reconciled(client, config, config.waits.restore_reconcile)
            .await
            .context("Operator did not complete reconciliation after restoration")?;

        info!("Verifying TLS profile was restored");
        let had_original = self.original.is_some();
        poll_until_converged(
            "observed config TLS restoration",
            config.waits.restore_observed.poll_config(),
            || async move {
                match client.controller_manager(resource).await {
                    Ok(ocm) => check_restored(&ocm, had_original),
                    Err(e) => Check::transient(e),
                }
            },
        )
        .await
        .context("TLS profile was not properly restored in observed config")?;

        Ok(())
    }
}

async fn apply_and_verify<C: ClusterApi>(client: &C, config: &AppConfig) -> Result<()> {
    let resource = config.resource_name.as_str();

    info!("Waiting for operator to detect TLS profile change and start progressing");
    if let Err(e) = wait_progressing(client, config).await {
        warn!(
            "Operator did not start progressing, continuing anyway: {:#}",
            e
        );
    }

    info!("Waiting for operator to complete reconciliation");
    wait_reconciled(client, config, config.waits.reconcile)
        .await
        .context("Operator did not complete reconciliation")?;

    info!("Verifying TLS config in observed config");
    poll_until_converged(
        "Modern TLS profile in observed config",
        config.waits.observed_config.poll_config(),
        || async move {
            match client.controller_manager(resource).await {
                Ok(ocm) => check_modern_observed(&ocm),
                Err(e) => Check::transient(e),
            }
        },
    )
    .await
    .context(
        "Modern TLS security profile from APIServer was not propagated to OpenShift Controller Manager observed config",
    )?;

    Ok(())
}

async fn read_original<C: ClusterApi>(
    client: &C,
    config: &AppConfig,
) -> Result<Option<TlsSecurityProfile>> {
    ensure_status_is_set(client, config).await?;

    let api_server = client
        .api_server(&config.resource_name)
        .await
        .context("Failed to get APIServer config")?;
    let original = api_server.spec.tls_security_profile;
    info!(
        "Original TLS profile: {}",
        original
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "cluster default".to_string())
    );
    Ok(original)
}

/// Scenario entry point
///
/// `deadline` bounds everything up to the observed-config check. Once the
/// original profile is known the restore always runs, after the deadline if
/// need be.
pub async fn run<C: ClusterApi>(
    client: &C,
    config: &AppConfig,
    deadline: TestDeadline,
) -> Result<()> {
    let original = deadline.bound(read_original(client, config)).await?;

    let outcome = deadline
        .bound(async {
            client
                .update_tls_profile(&config.resource_name, Some(&TlsSecurityProfile::modern()))
                .await
                .context("Failed to update APIServer TLS profile to Modern")?;
            apply_and_verify(client, config).await
        })
        .await;

    ProfileRestore::new(original).run(client, config).await;
    outcome
}
