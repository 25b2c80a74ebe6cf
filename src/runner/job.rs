//! Execution of a single test job.
//!
//! A job moves through resolve → render → assert. Skipped jobs stop before
//! resolving; a render failure stops before asserting unless some assertion
//! is about the render outcome itself.

use std::time::Instant;

use serde_yaml::Value;
use tracing::debug;

use crate::assertion::Assertion;
use crate::model::{ContextDefaults, TestJob, TestSuite};
use crate::render::{Chart, ChartRenderer, Document, RenderError, RenderRequest, RenderedChart};
use crate::results::{AssertionResult, TestJobResult};
use crate::snapshot::SnapshotComparer;
use crate::validators::report::standalone_error;
use crate::validators::{Outcome, Scope, Validate, ValidateContext};
use crate::values;

const NO_TEMPLATE_SELECTED: &str = "assertion.template must be given if testsuite.templates is empty";

/// Everything assertions of one job are evaluated against.
struct JobState<'a> {
    job: &'a TestJob,
    /// The job's template selection; empty selects everything rendered.
    selection: Vec<String>,
    /// The suite's `excludeTemplates`, never selected.
    excluded: Vec<String>,
    rendered: RenderedChart,
    render_error: Option<RenderError>,
}

pub fn run_job(
    suite: &TestSuite,
    job: &TestJob,
    chart: &Chart,
    renderer: &dyn ChartRenderer,
    snapshots: &mut dyn SnapshotComparer,
) -> TestJobResult {
    let started = Instant::now();
    let mut result = TestJobResult {
        display_name: job.name.clone(),
        ..Default::default()
    };

    if let Some(reason) = &job.skip {
        debug!(job = %job.name, reason = %reason, "skipping job");
        result.passed = true;
        result.skipped = true;
        result.skip_reason = Some(reason.clone());
        return result;
    }
    if job.asserts.is_empty() {
        result.exec_error = Some(crate::errors::ChartCheckError::NoAsserts.to_string());
        return result;
    }

    let state = match prepare(suite, job, chart, renderer) {
        Ok(state) => state,
        Err(message) => {
            result.exec_error = Some(message);
            result.duration = started.elapsed();
            return result;
        }
    };

    if let Some(error) = &state.render_error {
        if !job.asserts.iter().any(Assertion::expects_render_outcome) {
            debug!(job = %job.name, %error, "render failed without failedTemplate assertion");
            result.exec_error = Some(error.to_string());
            result.duration = started.elapsed();
            return result;
        }
    }

    result.assertions_result = job
        .asserts
        .iter()
        .enumerate()
        .map(|(index, assertion)| {
            let (passed, fail_info) = state.evaluate(assertion, snapshots);
            AssertionResult {
                index,
                assert_type: assertion.assert_type.to_string(),
                not: assertion.not,
                passed,
                fail_info,
            }
        })
        .collect();
    result.passed = result.assertions_result.iter().all(|a| a.passed);
    result.duration = started.elapsed();
    debug!(job = %job.name, passed = result.passed, "job finished");
    result
}

/// Resolves the job's context and values and renders the chart. `Err` is a
/// setup failure reported as the job's exec error.
fn prepare<'a>(
    suite: &TestSuite,
    job: &'a TestJob,
    chart: &Chart,
    renderer: &dyn ChartRenderer,
) -> Result<JobState<'a>, String> {
    let defaults = ContextDefaults::for_chart(&chart.metadata);
    let context = suite.effective_context(job, &defaults);

    let files = suite.job_values_files(job);
    let values: Value =
        values::compile(&files, &[&suite.set, &job.set]).map_err(|e| e.to_string())?;

    let selection = suite.job_templates(job);
    let request = RenderRequest {
        chart,
        metadata: &context.chart,
        values: &values,
        release: &context.release,
        capabilities: &context.capabilities,
        templates: &selection,
    };
    let (rendered, render_error) = match renderer.render(&request) {
        Ok(rendered) => (rendered, None),
        Err(error) => (RenderedChart::new(), Some(error)),
    };
    debug!(
        job = %job.name,
        templates = rendered.len(),
        failed = render_error.is_some(),
        "rendered chart"
    );
    Ok(JobState {
        job,
        selection,
        excluded: suite.exclude_templates.clone(),
        rendered,
        render_error,
    })
}

impl JobState<'_> {
    /// Templates an assertion applies to, in order.
    fn targets(&self, assertion: &Assertion) -> Vec<String> {
        if let Some(template) = &assertion.template {
            return vec![template.clone()];
        }
        if !self.selection.is_empty() {
            return self.selection.clone();
        }
        let mut names: Vec<String> = Vec::new();
        for name in self.rendered.template_names() {
            if !self.is_excluded(name) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Documents of `template`, if it was both selected and rendered.
    fn documents(&self, template: &str) -> Option<&[Document]> {
        let selected = !self.is_excluded(template)
            && (self.selection.is_empty() || self.selection.iter().any(|t| t == template));
        selected.then(|| self.rendered.get(template)).flatten()
    }

    fn is_excluded(&self, template: &str) -> bool {
        self.excluded.iter().any(|t| t == template)
    }

    fn document_index(&self, assertion: &Assertion, documents: &[Document]) -> Result<usize, String> {
        if let Some(index) = assertion.document_index {
            return Ok(index);
        }
        if let Some(selector) = &self.job.document_selector {
            return selector.select(documents).ok_or_else(|| {
                format!(
                    "no document matches documentSelector {} = {}",
                    selector.path,
                    crate::validators::report::to_yaml(&selector.value)
                )
            });
        }
        Ok(self.job.document_index.unwrap_or(0))
    }

    /// Template-scoped validators see every document, so only document
    /// scope goes through index and selector resolution.
    fn resolve_index(&self, assertion: &Assertion, documents: &[Document]) -> Result<usize, String> {
        match assertion.scope() {
            Scope::Document => self.document_index(assertion, documents),
            _ => Ok(assertion.document_index.unwrap_or(0)),
        }
    }

    fn evaluate(&self, assertion: &Assertion, snapshots: &mut dyn SnapshotComparer) -> Outcome {
        let negative = assertion.is_negative();
        let targets = self.targets(assertion);
        let first_target = targets.first().map(String::as_str).unwrap_or("");

        if assertion.scope() == Scope::RenderOutcome {
            let mut ctx = ValidateContext {
                template: first_target,
                documents: &[],
                document_index: assertion.document_index.unwrap_or(0),
                negative,
                render_error: self.render_error.as_ref(),
                snapshots,
            };
            return assertion.validator.validate(&mut ctx);
        }

        if let Some(error) = &self.render_error {
            return standalone_error(
                first_target,
                assertion.document_index.unwrap_or(0),
                format!("render failed: {}", error),
            );
        }
        if targets.is_empty() {
            return standalone_error("", 0, NO_TEMPLATE_SELECTED);
        }

        if assertion.scope() == Scope::Selection {
            let mut combined = Vec::new();
            for template in &targets {
                match self.documents(template) {
                    Some(documents) => combined.extend(documents.iter().cloned()),
                    None => return not_exists(template),
                }
            }
            let joined = targets.join(", ");
            let mut ctx = ValidateContext {
                template: &joined,
                documents: &combined,
                document_index: 0,
                negative,
                render_error: None,
                snapshots,
            };
            return assertion.validator.validate(&mut ctx);
        }

        let mut passed = true;
        let mut fail_info = Vec::new();
        for template in &targets {
            let (ok, info) = match self.documents(template) {
                None => not_exists(template),
                Some(documents) => match self.resolve_index(assertion, documents) {
                    Err(message) => standalone_error(template, 0, message),
                    Ok(document_index) => {
                        let mut ctx = ValidateContext {
                            template,
                            documents,
                            document_index,
                            negative,
                            render_error: None,
                            snapshots: &mut *snapshots,
                        };
                        assertion.validator.validate(&mut ctx)
                    }
                },
            };
            passed &= ok;
            fail_info.extend(info);
        }
        (passed, fail_info)
    }
}

fn not_exists(template: &str) -> Outcome {
    (
        false,
        vec![
            "Error:".to_string(),
            format!("\ttemplate \"{}\" not exists or not selected in test suite", template),
        ],
    )
}
