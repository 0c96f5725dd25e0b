//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// E2E test extension for the OpenShift controller manager operator
#[derive(Parser, Debug)]
#[command(name = "ocm-operator-tests-ext")]
#[command(version)]
#[command(about = "Run the controller manager operator e2e tests against a live cluster")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Args {
    /// Effective log level: `-v` wins over `--log-level`
    pub fn log_level(&self) -> Option<LogLevel> {
        if self.verbose {
            Some(LogLevel::Debug)
        } else {
            self.log_level
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print extension metadata and suites as JSON
    Info,

    /// List registered tests or suites
    List(ListArgs),

    /// Run tests by name
    RunTest(RunTestArgs),

    /// Run every test selected by a suite
    RunSuite(RunSuiteArgs),
}

/// What to list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    #[default]
    Tests,
    Suites,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Tests or suites
    #[arg(value_enum, default_value_t = ListKind::Tests)]
    pub kind: ListKind,

    /// Only tests selected by this suite
    #[arg(short, long)]
    pub suite: Option<String>,

    /// Output format (names, json, json-pretty, table)
    #[arg(short, long, default_value = "names")]
    pub output: OutputFormat,
}

/// Cluster connection arguments
#[derive(Parser, Debug)]
pub struct ClusterArgs {
    /// Kubeconfig file; defaults to KUBECONFIG or in-cluster config
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format (table, json, json-pretty, names)
    #[arg(short, long, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for run-test command
#[derive(Parser, Debug)]
pub struct RunTestArgs {
    /// Full test names
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}

/// Arguments for run-suite command
#[derive(Parser, Debug)]
pub struct RunSuiteArgs {
    /// Suite name
    pub suite: String,

    /// Override the suite's parallelism
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    #[command(flatten)]
    pub cluster: ClusterArgs,
}
