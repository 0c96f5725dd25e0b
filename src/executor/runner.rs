//! Spec runner
//!
//! Executes extension specs against a [`ClusterApi`] implementation. Each
//! spec gets a [`TestDeadline`] from the per-test timeout; at most
//! `parallelism` specs are in flight at once.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{error, info};

use crate::cluster::ClusterApi;
use crate::config::AppConfig;
use crate::extension::{ExtensionSpec, Suite};
use crate::models::{RunSummary, TestResult};
use crate::scenarios::{self, TestDeadline};
use crate::utils::Timer;

/// Runs specs against one cluster client
pub struct SpecRunner<'a, C> {
    client: &'a C,
    config: &'a AppConfig,
    parallelism: usize,
    test_timeout: Duration,
}

impl<'a, C: ClusterApi> SpecRunner<'a, C> {
    /// Sequential runner using the configured per-test timeout
    pub fn new(client: &'a C, config: &'a AppConfig) -> Self {
        Self {
            client,
            config,
            parallelism: 1,
            test_timeout: config.test_timeout(),
        }
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Take parallelism and timeout from a suite definition
    ///
    /// The suite timeout is an upper bound; a shorter configured timeout wins.
    pub fn for_suite(self, suite: &Suite) -> Self {
        let timeout = suite
            .timeout()
            .map_or(self.test_timeout, |t| t.min(self.test_timeout));
        self.parallelism(suite.parallelism).test_timeout(timeout)
    }

    /// Run a single spec
    pub async fn run_spec(&self, spec: &ExtensionSpec) -> TestResult {
        info!("Running {}", spec.name);
        let start_time = Utc::now();
        let timer = Timer::start(&spec.name);

        let deadline = TestDeadline::after(self.test_timeout);
        let outcome =
            scenarios::run_test(spec.test_case, self.client, self.config, deadline).await;
        let duration = timer.stop();

        let result = match outcome {
            Ok(()) => TestResult::pass(spec.test_case, start_time, duration),
            Err(e) => {
                error!("{} failed: {:#}", spec.name, e);
                TestResult::fail(spec.test_case, start_time, duration, format!("{e:#}"))
            }
        };

        info!("  {}", result);
        result
    }

    /// Run specs concurrently; results keep the order of `specs`
    pub async fn run_specs(&self, specs: &[&ExtensionSpec]) -> Vec<TestResult> {
        let mut indexed: Vec<(usize, TestResult)> = stream::iter(specs.iter().enumerate())
            .map(|(i, spec)| async move { (i, self.run_spec(spec).await) })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Run specs and aggregate a summary
    pub async fn run(&self, suite: Option<&str>, specs: &[&ExtensionSpec]) -> RunSummary {
        info!(
            "Running {} specs with parallelism {}",
            specs.len(),
            self.parallelism
        );
        let summary = RunSummary::new(suite.map(str::to_string), self.run_specs(specs).await);
        info!(
            "Run completed - Pass: {}/{} ({:.1}%)",
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        summary
    }
}

/// Every spec reported as an error when no cluster client could be built
pub fn setup_failed(
    suite: Option<&str>,
    specs: &[&ExtensionSpec],
    err: &anyhow::Error,
) -> RunSummary {
    let message = format!("setup failed: {err:#}");
    let results = specs
        .iter()
        .map(|spec| TestResult::error(spec.test_case, message.clone()))
        .collect();
    RunSummary::new(suite.map(str::to_string), results)
}
