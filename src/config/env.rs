//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "OCM_E2E";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from OCM_E2E_CONFIG
    pub config_file: Option<String>,
    /// ClusterOperator name from OCM_E2E_OPERATOR
    pub operator: Option<String>,
    /// Resource name from OCM_E2E_RESOURCE
    pub resource: Option<String>,
    /// Test timeout from OCM_E2E_TEST_TIMEOUT
    pub test_timeout: Option<u64>,
    /// Log level from OCM_E2E_LOG_LEVEL
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            operator: get_env("OPERATOR"),
            resource: get_env("RESOURCE"),
            test_timeout: get_env_parse("TEST_TIMEOUT"),
            log_level: get_env("LOG_LEVEL"),
        }
    }

    /// Check if any prefixed environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.operator.is_some()
            || self.resource.is_some()
            || self.test_timeout.is_some()
            || self.log_level.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get and parse environment variable with prefix
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}
