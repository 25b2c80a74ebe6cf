//! In-memory document model for test suites.
//!
//! A [`TestSuite`] is built from one YAML document by [`crate::parser`] and is
//! never mutated afterwards. Effective rendering contexts are derived from it
//! on demand by [`TestSuite::effective_context`].

use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::assertion::Assertion;
use crate::path::DocPath;
use crate::render::{Capabilities, ChartMetadata, Release};

pub mod field;
pub mod overrides;

pub use field::Field;
pub use overrides::{CapabilitiesOverride, ChartOverride, Merge, ReleaseOverride};

/// A named group of test jobs sharing template selection and default context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestSuite {
    pub name: String,
    /// Chart-relative template paths; empty selects every template.
    pub templates: Vec<String>,
    pub exclude_templates: Vec<String>,
    /// Namespace of this suite's snapshots inside its snapshot file.
    pub snapshot_id: String,
    pub capabilities: CapabilitiesOverride,
    pub chart: ChartOverride,
    pub release: ReleaseOverride,
    /// Values files, already resolved against the suite file's directory.
    pub values: Vec<PathBuf>,
    pub set: Mapping,
    pub tests: Vec<TestJob>,
    /// File (or rendered template) the suite came from.
    pub source: Option<PathBuf>,
}

/// One test case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestJob {
    pub name: String,
    pub template: Option<String>,
    pub templates: Vec<String>,
    pub document_index: Option<usize>,
    pub document_selector: Option<DocumentSelector>,
    pub capabilities: CapabilitiesOverride,
    pub chart: ChartOverride,
    pub release: ReleaseOverride,
    pub values: Vec<PathBuf>,
    pub set: Mapping,
    /// Reason given for skipping, if the job is skipped.
    pub skip: Option<String>,
    pub asserts: Vec<Assertion>,
}

/// Picks the document whose `path` holds `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSelector {
    pub path: DocPath,
    pub value: Value,
}

impl DocumentSelector {
    pub fn select(&self, documents: &[Value]) -> Option<usize> {
        documents
            .iter()
            .position(|doc| self.path.lookup(doc) == Some(&self.value))
    }
}

/// Defaults a job context is layered onto.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDefaults {
    pub capabilities: Capabilities,
    pub chart: ChartMetadata,
    pub release: Release,
}

impl ContextDefaults {
    pub fn for_chart(chart: &ChartMetadata) -> Self {
        Self {
            capabilities: Capabilities::default(),
            chart: chart.clone(),
            release: Release::default(),
        }
    }
}

/// The rendering context a job actually runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveContext {
    pub capabilities: Capabilities,
    pub chart: ChartMetadata,
    pub release: Release,
}

impl TestSuite {
    /// Resolves defaults ← suite ← job, leaf by leaf.
    pub fn effective_context(&self, job: &TestJob, defaults: &ContextDefaults) -> EffectiveContext {
        let capabilities = CapabilitiesOverride::from(&defaults.capabilities)
            .merge(&self.capabilities)
            .merge(&job.capabilities)
            .resolve(&defaults.capabilities);
        let chart = self.chart.merge(&job.chart).resolve(&defaults.chart);
        let release = self.release.merge(&job.release).resolve(&defaults.release);
        EffectiveContext {
            capabilities,
            chart,
            release,
        }
    }

    /// Templates a job renders: its own selection, else the suite's, minus
    /// the suite's exclusions.
    pub fn job_templates(&self, job: &TestJob) -> Vec<String> {
        let selected = match (&job.template, job.templates.is_empty()) {
            (Some(template), _) => vec![template.clone()],
            (None, false) => job.templates.clone(),
            (None, true) => self.templates.clone(),
        };
        selected
            .into_iter()
            .filter(|t| !self.exclude_templates.contains(t))
            .collect()
    }

    /// Values files in the order they are applied: suite, then job.
    pub fn job_values_files(&self, job: &TestJob) -> Vec<PathBuf> {
        self.values.iter().chain(job.values.iter()).cloned().collect()
    }
}

/// Normalises a user-written template selector into a chart-relative path.
///
/// `deployment.yaml` and `basic/templates/deployment.yaml` both become
/// `templates/deployment.yaml` for chart `basic`; `charts/...` and
/// `templates/...` selectors are kept.
pub fn normalize_template(selector: &str, chart_name: &str) -> String {
    let selector = selector.trim().trim_start_matches("./");
    let selector = selector
        .strip_prefix(chart_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(selector);
    if selector.starts_with("templates/") || selector.starts_with("charts/") {
        selector.to_string()
    } else {
        format!("templates/{}", selector)
    }
}
