//! The seam between the test engine and whatever renders chart templates.
//!
//! The engine never renders templates itself. It resolves an effective
//! [`RenderRequest`] per test job and hands it to a [`ChartRenderer`]. The
//! renderer answers with the documents of every rendered template, in render
//! order, or with a [`RenderError`] that `failedTemplate` assertions consume.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::errors::{ChartCheckError, Result};

pub mod helm;

pub use helm::HelmRenderer;

/// One rendered YAML document (usually a Kubernetes manifest).
pub type Document = Value;

pub const DEFAULT_RELEASE_NAME: &str = "RELEASE-NAME";
pub const DEFAULT_RELEASE_NAMESPACE: &str = "NAMESPACE";
pub const DEFAULT_RELEASE_REVISION: u32 = 1;
pub const DEFAULT_KUBE_MAJOR_VERSION: &str = "1";
pub const DEFAULT_KUBE_MINOR_VERSION: &str = "20";

// ============================================================================
// EFFECTIVE CONTEXTS
// ============================================================================

/// Chart metadata as the renderer should see it (`.Chart.Version` etc.).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub app_version: String,
}

/// Release information (`.Release.*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub upgrade: bool,
}

impl Default for Release {
    fn default() -> Self {
        Self {
            name: DEFAULT_RELEASE_NAME.to_string(),
            namespace: DEFAULT_RELEASE_NAMESPACE.to_string(),
            revision: DEFAULT_RELEASE_REVISION,
            upgrade: false,
        }
    }
}

/// Platform capabilities (`.Capabilities.KubeVersion`, `.Capabilities.APIVersions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub major_version: String,
    pub minor_version: String,
    pub api_versions: Vec<String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            major_version: DEFAULT_KUBE_MAJOR_VERSION.to_string(),
            minor_version: DEFAULT_KUBE_MINOR_VERSION.to_string(),
            api_versions: Vec::new(),
        }
    }
}

// ============================================================================
// CHART
// ============================================================================

/// A chart under test: where it lives and the metadata from its `Chart.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub path: PathBuf,
    pub metadata: ChartMetadata,
}

impl Chart {
    pub fn new(path: impl Into<PathBuf>, metadata: ChartMetadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    /// Reads `Chart.yaml` from the chart directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = path.join("Chart.yaml");
        let content = std::fs::read_to_string(&manifest)
            .map_err(|e| ChartCheckError::io(&manifest, e))?;
        let metadata: ChartMetadata =
            serde_yaml::from_str(&content).map_err(|e| ChartCheckError::Chart {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if metadata.name.is_empty() {
            return Err(ChartCheckError::Chart {
                path: path.to_path_buf(),
                reason: "Chart.yaml has an empty `name`".to_string(),
            });
        }
        Ok(Self::new(path, metadata))
    }
}

// ============================================================================
// RENDER INPUT / OUTPUT
// ============================================================================

/// Everything a renderer needs for one test job.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub chart: &'a Chart,
    /// Effective chart metadata after suite/job overrides.
    pub metadata: &'a ChartMetadata,
    /// User-supplied values, merged by the values compiler. Chart defaults are
    /// the renderer's business.
    pub values: &'a Value,
    pub release: &'a Release,
    pub capabilities: &'a Capabilities,
    /// Chart-relative template paths to render. Empty means every template.
    pub templates: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedTemplate {
    pub name: String,
    pub documents: Vec<Document>,
}

/// Render output, keyed by chart-relative template path.
///
/// Template order and per-template document order are exactly what the
/// renderer produced; document indices in assertions depend on it. When two
/// entries share a name the first one wins on lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedChart {
    templates: Vec<RenderedTemplate>,
}

impl RenderedChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document to `template`, creating the entry on first use.
    pub fn push_document(&mut self, template: &str, document: Document) {
        match self.templates.iter_mut().find(|t| t.name == template) {
            Some(entry) => entry.documents.push(document),
            None => self.templates.push(RenderedTemplate {
                name: template.to_string(),
                documents: vec![document],
            }),
        }
    }

    /// Records a template that rendered, possibly to zero documents.
    pub fn insert_template(&mut self, template: &str, documents: Vec<Document>) {
        self.templates.push(RenderedTemplate {
            name: template.to_string(),
            documents,
        });
    }

    pub fn get(&self, template: &str) -> Option<&[Document]> {
        self.templates
            .iter()
            .find(|t| t.name == template)
            .map(|t| t.documents.as_slice())
    }

    pub fn contains(&self, template: &str) -> bool {
        self.get(template).is_some()
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Why rendering produced no output.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum RenderError {
    /// The template engine rejected the chart (a `fail` call, a missing
    /// required value, a schema violation, ...).
    #[error("{message}")]
    #[diagnostic(code(chartcheck::render::template))]
    Template {
        template: Option<String>,
        message: String,
    },

    #[error("failed to run renderer `{program}`: {reason}")]
    #[diagnostic(code(chartcheck::render::spawn))]
    Spawn { program: String, reason: String },

    #[error("renderer produced unreadable output for {template}: {reason}")]
    #[diagnostic(code(chartcheck::render::output))]
    Output { template: String, reason: String },
}

impl RenderError {
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            template: None,
            message: message.into(),
        }
    }
}

/// Renders a chart for one test job.
///
/// Implementations must return an entry for every explicitly requested
/// template that exists in the chart, even when it renders to nothing, so
/// that `hasDocuments: {count: 0}` can be asserted.
pub trait ChartRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> std::result::Result<RenderedChart, RenderError>;
}

impl<R: ChartRenderer + ?Sized> ChartRenderer for &R {
    fn render(&self, request: &RenderRequest<'_>) -> std::result::Result<RenderedChart, RenderError> {
        (**self).render(request)
    }
}
