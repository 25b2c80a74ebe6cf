//! [`ChartRenderer`] backed by the `helm template` command.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_yaml::{Mapping, Value};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use super::{Chart, ChartMetadata, ChartRenderer, RenderError, RenderRequest, RenderedChart};

const SOURCE_MARKER: &str = "# Source: ";

/// Shells out to `helm template`, feeding the compiled values on stdin.
///
/// `helm template` has no flag for the release revision, so it is ignored.
/// Chart version overrides are applied to a staged copy of the chart.
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    program: PathBuf,
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl HelmRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, request: &RenderRequest<'_>, chart_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("template")
            .arg(&request.release.name)
            .arg(chart_path)
            .arg("--namespace")
            .arg(&request.release.namespace)
            .arg("--kube-version")
            .arg(format!(
                "v{}.{}",
                request.capabilities.major_version, request.capabilities.minor_version
            ));
        for api_version in &request.capabilities.api_versions {
            cmd.arg("--api-versions").arg(api_version);
        }
        if request.release.upgrade {
            cmd.arg("--is-upgrade");
        }
        cmd.arg("--values")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_error(&self, reason: impl ToString) -> RenderError {
        RenderError::Spawn {
            program: self.program.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ChartRenderer for HelmRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedChart, RenderError> {
        let staged = if request.metadata != &request.chart.metadata {
            debug!(
                chart = %request.chart.metadata.name,
                version = %request.metadata.version,
                app_version = %request.metadata.app_version,
                "staging chart with overridden metadata"
            );
            Some(stage_chart(request.chart, request.metadata).map_err(|e| self.spawn_error(e))?)
        } else {
            None
        };
        let chart_path = staged
            .as_ref()
            .map_or(request.chart.path.as_path(), |s| s.path.as_path());

        let values = serde_yaml::to_string(request.values).map_err(|e| self.spawn_error(e))?;
        let mut child = self
            .command(request, chart_path)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(values.as_bytes())
                .map_err(|e| self.spawn_error(e))?;
        }
        let output = child.wait_with_output().map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::template(clean_helm_error(&stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut rendered = split_rendered_output(&stdout, &request.chart.metadata.name)?;

        // Requested templates that exist but rendered nothing still count.
        for template in request.templates {
            if !rendered.contains(template) && request.chart.path.join(template).is_file() {
                rendered.insert_template(template, Vec::new());
            }
        }
        debug!(
            chart = %request.chart.metadata.name,
            templates = rendered.len(),
            "helm template finished"
        );
        Ok(rendered)
    }
}

/// A copy of a chart in a scratch directory, removed on drop.
struct StagedChart {
    _dir: TempDir,
    path: PathBuf,
}

/// Copies the chart into a scratch directory and rewrites `version` and
/// `appVersion` of the copy's `Chart.yaml` to `metadata`.
fn stage_chart(chart: &Chart, metadata: &ChartMetadata) -> io::Result<StagedChart> {
    let dir = tempfile::Builder::new().prefix("chartcheck-").tempdir()?;
    let path = dir.path().join(&chart.metadata.name);

    for entry in WalkDir::new(&chart.path).follow_links(true) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(&chart.path)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = path.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }

    let manifest = path.join("Chart.yaml");
    let invalid = |e: serde_yaml::Error| io::Error::new(io::ErrorKind::InvalidData, e);
    let mut fields: Mapping = serde_yaml::from_str(&std::fs::read_to_string(&manifest)?)
        .map_err(invalid)?;
    fields.insert("version".into(), Value::from(metadata.version.as_str()));
    if metadata.app_version.is_empty() {
        fields.remove("appVersion");
    } else {
        fields.insert("appVersion".into(), Value::from(metadata.app_version.as_str()));
    }
    std::fs::write(&manifest, serde_yaml::to_string(&fields).map_err(invalid)?)?;

    Ok(StagedChart { _dir: dir, path })
}

fn clean_helm_error(stderr: &str) -> String {
    let message = stderr.trim();
    message.strip_prefix("Error: ").unwrap_or(message).to_string()
}

/// Splits `helm template` output into per-template document lists, using the
/// `# Source:` comment helm writes above every document.
pub fn split_rendered_output(output: &str, chart_name: &str) -> Result<RenderedChart, RenderError> {
    let mut rendered = RenderedChart::new();
    let prefix = format!("{}/", chart_name);

    for chunk in crate::parser::split_documents(output) {
        let Some(source) = chunk
            .lines()
            .find_map(|line| line.strip_prefix(SOURCE_MARKER))
        else {
            continue;
        };
        let template = source.trim();
        let template = template.strip_prefix(&prefix).unwrap_or(template);

        let document: serde_yaml::Value =
            serde_yaml::from_str(chunk).map_err(|e| RenderError::Output {
                template: template.to_string(),
                reason: e.to_string(),
            })?;
        if document.is_null() {
            if !rendered.contains(template) {
                rendered.insert_template(template, Vec::new());
            }
            continue;
        }
        rendered.push_document(template, document);
    }

    Ok(rendered)
}
