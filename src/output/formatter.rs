//! Output formatters for test results and registry listings
//!
//! Provides table, JSON and plain name output formats.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::extension::{Extension, ExtensionSpec, Suite};
use crate::models::{RunSummary, TestResult, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Names,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "names" | "name" => Ok(OutputFormat::Names),
            other => Err(format!(
                "unknown output format '{other}' (expected table, json, json-pretty or names)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonPretty => write!(f, "json-pretty"),
            OutputFormat::Names => write!(f, "names"),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }

    fn status_label(&self, status: TestStatus) -> &'static str {
        if self.colorize {
            match status {
                TestStatus::Pass => "\x1b[32m✓ PASS\x1b[0m",
                TestStatus::Fail => "\x1b[31m✗ FAIL\x1b[0m",
                TestStatus::Skip => "\x1b[33m○ SKIP\x1b[0m",
                TestStatus::Error => "\x1b[31m! ERROR\x1b[0m",
            }
        } else {
            match status {
                TestStatus::Pass => "✓ PASS",
                TestStatus::Fail => "✗ FAIL",
                TestStatus::Skip => "○ SKIP",
                TestStatus::Error => "! ERROR",
            }
        }
    }

    fn format_result_table(&self, result: &TestResult) -> String {
        let mut line = format!(
            "{} {} [{:>8}ms]",
            self.status_label(result.status),
            result.name,
            result.duration_ms
        );
        if let Some(error) = &result.error {
            for detail in error.lines() {
                line.push_str("\n      ");
                line.push_str(detail);
            }
        }
        line
    }

    /// Format a run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(summary),
            OutputFormat::Names => summary
                .results
                .iter()
                .map(|r| format!("{}\t{}", r.status, r.name))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        match &summary.suite {
            Some(suite) => output.push_str(&format!(" Suite: {suite}\n")),
            None => output.push_str(" Selected tests\n"),
        }
        output.push_str("══════════════════════════════════════════════════════════════\n");

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_table(result)));
        }

        output.push_str("──────────────────────────────────────────────────────────────\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}\n",
            summary.total, pass_str, fail_str, summary.skipped, summary.errors
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    /// Format registered specs
    pub fn format_specs(&self, specs: &[&ExtensionSpec]) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut output = String::new();
                output.push_str(&format!("{:<10} {}\n", "LIFECYCLE", "NAME"));
                for spec in specs {
                    output.push_str(&format!("{:<10} {}\n", spec.lifecycle, spec.name));
                }
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(specs),
            OutputFormat::Names => specs
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Format suite definitions
    pub fn format_suites(&self, suites: &[Suite]) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut output = String::new();
                for suite in suites {
                    output.push_str(&format!("{}\n", suite.name));
                    if !suite.description.is_empty() {
                        output.push_str(&format!("    {}\n", suite.description));
                    }
                    output.push_str(&format!("    parallelism: {}\n", suite.parallelism));
                    if let Some(timeout) = suite.test_timeout_secs {
                        output.push_str(&format!("    test timeout: {timeout}s\n"));
                    }
                    for qualifier in &suite.qualifiers {
                        output.push_str(&format!("    qualifier: {qualifier}\n"));
                    }
                }
                output
            }
            OutputFormat::Json | OutputFormat::JsonPretty => self.json(suites),
            OutputFormat::Names => suites
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Format extension metadata; always JSON
    pub fn format_info(&self, extension: &Extension) -> String {
        serde_json::to_string_pretty(extension).unwrap_or_default()
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}
