//! Test extension registry
//!
//! Registers the e2e specs and the suites that group them. A suite selects
//! specs through qualifier expressions and declares how many of them may
//! run at once; the serial suite is how conflicting scenarios against the
//! shared cluster are kept apart.

mod qualifier;

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

pub use qualifier::{Qualifier, QualifierError, TestView};

use crate::models::TestCase;

pub const PRODUCT: &str = "openshift";
pub const KIND: &str = "payload";
pub const COMPONENT: &str = "cluster-openshift-controller-manager-operator";

const SUITE_PREFIX: &str = "openshift/cluster-openshift-controller-manager-operator";

/// Extension identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    pub product: String,
    pub kind: String,
    pub name: String,
}

impl Component {
    pub fn identifier(&self) -> String {
        format!("{}:{}:{}", self.product, self.kind, self.name)
    }
}

/// Build provenance
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub commit: String,
    pub build_date: String,
    pub git_tree_state: String,
}

impl Source {
    /// Provenance stamped at build time through environment variables
    pub fn from_build_env() -> Self {
        Self {
            commit: option_env!("SOURCE_GIT_COMMIT")
                .unwrap_or("unknown")
                .to_string(),
            build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_string(),
            git_tree_state: option_env!("SOURCE_GIT_TREE_STATE")
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

/// Whether a failing spec blocks the payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Blocking,
    Informing,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Lifecycle::Blocking => "blocking",
            Lifecycle::Informing => "informing",
        })
    }
}

/// A registered spec
#[derive(Clone, Debug, Serialize)]
pub struct ExtensionSpec {
    pub name: String,
    pub labels: BTreeSet<String>,
    pub lifecycle: Lifecycle,
    #[serde(skip)]
    pub test_case: TestCase,
}

impl ExtensionSpec {
    pub fn from_test_case(test_case: TestCase) -> Self {
        let name = test_case.name();
        Self {
            labels: bracketed_labels(&name),
            name,
            lifecycle: Lifecycle::Blocking,
            test_case,
        }
    }

    pub fn view(&self) -> TestView<'_> {
        TestView {
            name: &self.name,
            labels: &self.labels,
        }
    }
}

/// Bracketed tokens of a spec name, e.g. `[Serial]` → `Serial`
pub fn bracketed_labels(name: &str) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    let mut rest = name;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        match after.find(']') {
            Some(end) => {
                let label = after[..end].trim();
                if !label.is_empty() {
                    labels.insert(label.to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    labels
}

/// A named group of specs
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub qualifiers: Vec<String>,
    pub parallelism: usize,
    /// Per-test timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_timeout_secs: Option<u64>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            qualifiers: Vec::new(),
            parallelism: 1,
            test_timeout_secs: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.test_timeout_secs.map(Duration::from_secs)
    }

    /// Parsed qualifiers
    pub fn compiled(&self) -> Result<Vec<Qualifier>, QualifierError> {
        self.qualifiers.iter().map(|q| Qualifier::parse(q)).collect()
    }

    /// Whether a spec belongs to this suite; no qualifiers selects everything
    pub fn includes(&self, spec: &ExtensionSpec) -> Result<bool, QualifierError> {
        let qualifiers = self.compiled()?;
        let view = spec.view();
        Ok(qualifiers.is_empty() || qualifiers.iter().any(|q| q.matches(&view)))
    }
}

/// A test extension: identity, suites and specs
#[derive(Clone, Debug, Serialize)]
pub struct Extension {
    pub component: Component,
    pub source: Source,
    pub suites: Vec<Suite>,
    #[serde(skip)]
    pub specs: Vec<ExtensionSpec>,
}

impl Extension {
    pub fn new(product: &str, kind: &str, name: &str) -> Self {
        Self {
            component: Component {
                product: product.to_string(),
                kind: kind.to_string(),
                name: name.to_string(),
            },
            source: Source::from_build_env(),
            suites: Vec::new(),
            specs: Vec::new(),
        }
    }

    pub fn add_suite(&mut self, suite: Suite) {
        self.suites.push(suite);
    }

    pub fn add_specs(&mut self, specs: impl IntoIterator<Item = ExtensionSpec>) {
        self.specs.extend(specs);
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn find_spec(&self, name: &str) -> Option<&ExtensionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Specs selected by a suite, in registration order
    pub fn specs_for_suite(&self, suite: &Suite) -> Result<Vec<&ExtensionSpec>> {
        let mut selected = Vec::new();
        for spec in &self.specs {
            if suite
                .includes(spec)
                .with_context(|| format!("Invalid qualifier in suite {}", suite.name))?
            {
                selected.push(spec);
            }
        }
        Ok(selected)
    }

    /// Resolve spec names; every name must be registered
    pub fn resolve_specs<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&ExtensionSpec>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.find_spec(name)
                    .with_context(|| format!("No test named {name:?}"))
            })
            .collect()
    }
}

/// Extensions by component identifier
#[derive(Debug, Default)]
pub struct Registry {
    extensions: BTreeMap<String, Extension>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Extension) {
        self.extensions
            .insert(extension.component.identifier(), extension);
    }

    pub fn get(&self, identifier: &str) -> Option<&Extension> {
        self.extensions.get(identifier)
    }

    /// The extension for this binary's component
    pub fn operator(&self) -> Result<&Extension> {
        let component = Component {
            product: PRODUCT.to_string(),
            kind: KIND.to_string(),
            name: COMPONENT.to_string(),
        };
        self.get(&component.identifier())
            .with_context(|| format!("Extension {} is not registered", component.identifier()))
    }
}

/// Build the registry with every spec and suite of this binary
pub fn operator_registry() -> Registry {
    let test_timeout = Duration::from_secs(30 * 60);
    let mut extension = Extension::new(PRODUCT, KIND, COMPONENT);

    extension.add_suite(
        Suite::new(format!("{SUITE_PREFIX}/operator/serial"))
            .description("Operator tests that mutate cluster-wide configuration")
            .qualifier(
                r#"test.Name.Contains("[Serial]") && (test.Name.Contains("[Operator]") || test.Name.Contains("[TLS]") || test.Name.Contains("[Build]") || test.Name.Contains("[Image]"))"#,
            )
            .parallelism(1)
            .test_timeout(test_timeout),
    );
    extension.add_suite(
        Suite::new(format!("{SUITE_PREFIX}/operator/parallel"))
            .description("Read-only operator tests")
            .qualifier(r#"!test.Name.Contains("[Serial]")"#)
            .parallelism(4)
            .test_timeout(test_timeout),
    );

    extension.add_specs(TestCase::all().into_iter().map(ExtensionSpec::from_test_case));

    let mut registry = Registry::new();
    registry.register(extension);
    registry
}
