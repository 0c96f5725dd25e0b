//! E2E scenarios against the controller manager operator
//!
//! Each scenario drives the cluster through [`ClusterApi`] and fails with an
//! error chain describing the first fatal wait or call. The per-test timeout
//! bounds the assertions of a scenario; cleanup runs after it on its own wait
//! budget, so a timed out test still leaves the cluster as it found it.

pub mod operator_status;
pub mod tls_profile;

use anyhow::{anyhow, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::cluster::ClusterApi;
use crate::config::AppConfig;
use crate::models::TestCase;

/// Per-test timeout, fixed when the test starts
#[derive(Clone, Copy, Debug)]
pub struct TestDeadline {
    deadline: Instant,
    timeout: Duration,
}

impl TestDeadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Run `fut`, failing the test once the deadline passes
    pub async fn bound<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout_at(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("test timed out after {:?}", self.timeout)),
        }
    }
}

/// Run a single scenario
pub async fn run_test<C: ClusterApi>(
    case: TestCase,
    client: &C,
    config: &AppConfig,
    deadline: TestDeadline,
) -> Result<()> {
    match case {
        TestCase::OperatorStatus => deadline.bound(operator_status::run(client, config)).await,
        TestCase::TlsProfilePropagation => tls_profile::run(client, config, deadline).await,
    }
}
