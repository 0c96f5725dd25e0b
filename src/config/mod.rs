//! Configuration module
//!
//! Handles loading and managing configuration: operator identity, per-test
//! timeout and the timing of every convergence wait.

mod env;
mod file;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use env::EnvConfig;
pub use file::ConfigFile;

use crate::poll::PollConfig;

/// Timing of one convergence wait
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Seconds between checks
    pub interval_secs: u64,

    /// Maximum wait in seconds
    pub timeout_secs: u64,

    /// Check before the first interval elapses
    #[serde(default = "default_immediate")]
    pub immediate: bool,
}

fn default_immediate() -> bool {
    true
}

impl WaitConfig {
    pub const fn new(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval_secs,
            timeout_secs,
            immediate: true,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.interval_secs),
            Duration::from_secs(self.timeout_secs),
        )
        .immediate(self.immediate)
    }

    fn validate(&self, name: &str) -> anyhow::Result<()> {
        if self.interval_secs == 0 || self.timeout_secs == 0 {
            anyhow::bail!("Wait '{name}' needs a non-zero interval and timeout");
        }
        if self.interval_secs > self.timeout_secs {
            anyhow::bail!(
                "Wait '{}' interval ({}s) exceeds its timeout ({}s)",
                name,
                self.interval_secs,
                self.timeout_secs
            );
        }
        Ok(())
    }
}

/// Timings of the named waits performed by the scenarios
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitTimings {
    /// Operator reports its core conditions
    pub operator_status: WaitConfig,

    /// Operator starts progressing after a change
    pub progressing_start: WaitConfig,

    /// Operator finishes reconciling a change
    pub reconcile: WaitConfig,

    /// Change appears in the observed config
    pub observed_config: WaitConfig,

    /// Operator finishes reconciling the restored profile
    pub restore_reconcile: WaitConfig,

    /// Restored profile appears in the observed config
    pub restore_observed: WaitConfig,
}

impl Default for WaitTimings {
    fn default() -> Self {
        Self {
            operator_status: WaitConfig::new(5, 300),
            progressing_start: WaitConfig::new(5, 300),
            reconcile: WaitConfig::new(10, 900),
            observed_config: WaitConfig::new(5, 120),
            restore_reconcile: WaitConfig::new(10, 600),
            restore_observed: WaitConfig::new(5, 120),
        }
    }
}

impl WaitTimings {
    fn named(&self) -> [(&'static str, &WaitConfig); 6] {
        [
            ("operator_status", &self.operator_status),
            ("progressing_start", &self.progressing_start),
            ("reconcile", &self.reconcile),
            ("observed_config", &self.observed_config),
            ("restore_reconcile", &self.restore_reconcile),
            ("restore_observed", &self.restore_observed),
        ]
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, wait) in self.named() {
            wait.validate(name)?;
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ClusterOperator reporting the operator's status
    pub operator_name: String,

    /// Name of the cluster-scoped configuration resources
    pub resource_name: String,

    /// Per-test timeout in seconds
    pub test_timeout_secs: u64,

    /// Convergence wait timings
    pub waits: WaitTimings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            operator_name: "openshift-controller-manager".to_string(),
            resource_name: "cluster".to_string(),
            test_timeout_secs: 30 * 60,
            waits: WaitTimings::default(),
        }
    }
}

impl AppConfig {
    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(operator) = &env.operator {
            self.operator_name = operator.clone();
        }
        if let Some(resource) = &env.resource {
            self.resource_name = resource.clone();
        }
        if let Some(timeout) = env.test_timeout {
            self.test_timeout_secs = timeout;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.operator_name.is_empty() || self.resource_name.is_empty() {
            anyhow::bail!("Operator and resource names must not be empty");
        }
        if self.test_timeout_secs == 0 {
            anyhow::bail!("Test timeout must be greater than zero");
        }
        self.waits.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.operator_name, "openshift-controller-manager");
        assert_eq!(config.test_timeout(), Duration::from_secs(1800));
        assert_eq!(config.waits.reconcile, WaitConfig::new(10, 900));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wait_poll_config() {
        let poll = WaitConfig::new(5, 120).poll_config();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.timeout, Duration::from_secs(120));
        assert!(poll.immediate);
    }

    #[test]
    fn test_invalid_waits() {
        let mut config = AppConfig::default();
        config.waits.observed_config = WaitConfig::new(0, 10);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.waits.reconcile = WaitConfig::new(60, 30);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("reconcile"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(&EnvConfig {
            operator: Some("other-operator".to_string()),
            test_timeout: Some(60),
            ..Default::default()
        });

        assert_eq!(config.operator_name, "other-operator");
        assert_eq!(config.resource_name, "cluster");
        assert_eq!(config.test_timeout_secs, 60);
    }
}
