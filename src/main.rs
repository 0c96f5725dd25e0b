//! OpenShift Controller Manager Operator E2E test extension
//!
//! A CLI that registers and runs end-to-end tests for the OpenShift
//! controller manager operator against a live cluster. Tests observe the
//! cluster from the outside and poll until the operator's observed state
//! converges on the desired configuration.
//!
//! ## Usage
//!
//! ```bash
//! # Extension metadata
//! ocm-operator-tests-ext info
//!
//! # List tests, optionally restricted to a suite
//! ocm-operator-tests-ext list tests --suite openshift/cluster-openshift-controller-manager-operator/operator/serial
//!
//! # Run one test
//! ocm-operator-tests-ext run-test "[sig-openshift-controller-manager] Operator Status [Operator] should report core ClusterOperator conditions"
//!
//! # Run a suite
//! ocm-operator-tests-ext run-suite openshift/cluster-openshift-controller-manager-operator/operator/parallel
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::{debug, error};

mod cli;
mod cluster;
mod config;
mod executor;
mod extension;
mod models;
mod output;
mod poll;
mod scenarios;
mod utils;

use cli::{Args, ClusterArgs, Command, ListArgs, ListKind, RunSuiteArgs, RunTestArgs};
use cluster::K8sClient;
use config::{AppConfig, ConfigFile, EnvConfig};
use executor::{setup_failed, SpecRunner};
use extension::{operator_registry, Extension, ExtensionSpec};
use models::RunSummary;
use output::{OutputFormat, ResultFormatter};
use utils::init_logger;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = args
        .log_level()
        .or_else(|| env.log_level.as_deref().and_then(|l| l.parse().ok()))
        .unwrap_or_default();
    init_logger(level);

    let Some(command) = args.command else {
        Args::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    };

    if env.has_any() {
        debug!("Applying OCM_E2E_* environment overrides");
    }
    let config = ConfigFile::resolve(args.config.as_deref(), &env)?;

    let registry = operator_registry();
    let extension = registry.operator()?;

    match command {
        Command::Info => {
            println!("{}", ResultFormatter::default().format_info(extension));
            Ok(ExitCode::SUCCESS)
        }
        Command::List(list_args) => {
            list(extension, list_args)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::RunTest(run_args) => run_tests(extension, &config, run_args).await,
        Command::RunSuite(run_args) => run_suite(extension, &config, run_args).await,
    }
}

/// List tests or suites
fn list(extension: &Extension, args: ListArgs) -> Result<()> {
    let formatter = ResultFormatter::new(args.output);

    match args.kind {
        ListKind::Tests => {
            let specs: Vec<&ExtensionSpec> = match &args.suite {
                Some(name) => {
                    let suite = extension
                        .suite(name)
                        .with_context(|| format!("No suite named {name:?}"))?;
                    extension.specs_for_suite(suite)?
                }
                None => extension.specs.iter().collect(),
            };
            println!("{}", formatter.format_specs(&specs));
        }
        ListKind::Suites => {
            println!("{}", formatter.format_suites(&extension.suites));
        }
    }

    Ok(())
}

/// Run tests by name
async fn run_tests(
    extension: &Extension,
    config: &AppConfig,
    args: RunTestArgs,
) -> Result<ExitCode> {
    let specs = extension.resolve_specs(args.names.as_slice())?;

    let summary = match K8sClient::connect(args.cluster.kubeconfig.as_deref()).await {
        Ok(client) => SpecRunner::new(&client, config).run(None, &specs).await,
        Err(e) => {
            error!("Cluster setup failed: {:#}", e);
            setup_failed(None, &specs, &e)
        }
    };

    Ok(report(&summary, &args.cluster))
}

/// Run every test selected by a suite
async fn run_suite(
    extension: &Extension,
    config: &AppConfig,
    args: RunSuiteArgs,
) -> Result<ExitCode> {
    let suite = extension
        .suite(&args.suite)
        .with_context(|| format!("No suite named {:?}", args.suite))?;
    let specs = extension.specs_for_suite(suite)?;
    let name = Some(suite.name.as_str());

    let summary = match K8sClient::connect(args.cluster.kubeconfig.as_deref()).await {
        Ok(client) => {
            let mut runner = SpecRunner::new(&client, config).for_suite(suite);
            if let Some(parallelism) = args.parallelism {
                runner = runner.parallelism(parallelism);
            }
            runner.run(name, &specs).await
        }
        Err(e) => {
            error!("Cluster setup failed: {:#}", e);
            setup_failed(name, &specs, &e)
        }
    };

    Ok(report(&summary, &args.cluster))
}

/// Print the summary and map it to the process exit status
fn report(summary: &RunSummary, args: &ClusterArgs) -> ExitCode {
    let formatter = match args.output {
        OutputFormat::Table => ResultFormatter::new(OutputFormat::Table),
        format => ResultFormatter::new(format).no_color(),
    };
    println!("{}", formatter.format_summary(summary));

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
