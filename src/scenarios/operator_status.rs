//! Operator status scenario
//!
//! The operator must publish its core ClusterOperator conditions before any
//! other assertion about it is meaningful.

use anyhow::{Context, Result};
use tracing::info;

use crate::cluster::{ClusterApi, ClusterOperator};
use crate::config::AppConfig;
use crate::models::conditions::{core_conditions_set, CORE_CONDITIONS};
use crate::poll::{poll_until_converged, Check};

/// Converged once Available, Progressing and Degraded are all reported
pub fn check_status_set(co: &ClusterOperator) -> Check {
    let conditions = co.conditions();
    Check::when(core_conditions_set(conditions), || {
        let reported: Vec<String> = conditions
            .iter()
            .map(|c| format!("{}={}", c.type_, c.status))
            .collect();
        format!(
            "waiting for {:?}, reported [{}]",
            CORE_CONDITIONS,
            reported.join(", ")
        )
    })
}

/// Wait until the operator reports its core conditions
pub async fn ensure_status_is_set<C: ClusterApi>(client: &C, config: &AppConfig) -> Result<()> {
    let name = config.operator_name.as_str();
    info!("Waiting for ClusterOperator {} to report its status", name);

    poll_until_converged(
        format!("ClusterOperator {name} status"),
        config.waits.operator_status.poll_config(),
        || async move {
            match client.cluster_operator(name).await {
                Ok(co) => check_status_set(&co),
                Err(e) => Check::transient(e),
            }
        },
    )
    .await
    .with_context(|| format!("ClusterOperator {name} never reported its core conditions"))?;

    Ok(())
}

/// Scenario entry point
pub async fn run<C: ClusterApi>(client: &C, config: &AppConfig) -> Result<()> {
    ensure_status_is_set(client, config).await
}
