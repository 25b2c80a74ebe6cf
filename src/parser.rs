//! # Suite Parser
//!
//! Turns test files into [`TestSuite`]s. A file may hold several YAML
//! documents separated by `---`; each document is one suite and is decoded on
//! its own, so a broken suite never hides its neighbours.
//!
//! Decoding is two-phase. The document is first read as a generic
//! `serde_yaml::Value`, then projected field by field through
//! [`fields::Fields`], which records key presence (for the three-state
//! override rules) and, in strict mode, which keys went unread.
//!
//! Errors come back next to the suites rather than instead of them:
//! validation findings (`no tests found`, `no asserts found`) and strict-mode
//! unknown fields still yield a suite, while YAML and assertion errors do not.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use tracing::debug;

use crate::assertion::Assertion;
use crate::errors::{ChartCheckError, Result};
use crate::model::{
    normalize_template, CapabilitiesOverride, ChartOverride, DocumentSelector, ReleaseOverride,
    TestJob, TestSuite,
};
use crate::path::DocPath;
use crate::render::{Capabilities, Chart, ChartRenderer, Release, RenderRequest};

pub mod fields;

use fields::Fields;

static DOCUMENT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^---[ \t]*(?:#.*)?\r?$").expect("static separator pattern"));

// ============================================================================
// PARSE RESULTS
// ============================================================================

/// Outcome of decoding one YAML document.
#[derive(Debug)]
pub struct SuiteEntry {
    /// File (or rendered template) the document came from.
    pub source: PathBuf,
    /// Zero-based position of the document within its source.
    pub document: usize,
    pub suite: Option<TestSuite>,
    pub errors: Vec<ChartCheckError>,
}

/// Everything decoded from one source, in document order.
#[derive(Debug, Default)]
pub struct ParsedSuites {
    pub entries: Vec<SuiteEntry>,
}

impl ParsedSuites {
    pub fn suites(&self) -> impl Iterator<Item = &TestSuite> {
        self.entries.iter().filter_map(|e| e.suite.as_ref())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ChartCheckError> {
        self.entries.iter().flat_map(|e| e.errors.iter())
    }

    pub fn first_error(&self) -> Option<&ChartCheckError> {
        self.errors().next()
    }

    pub fn is_clean(&self) -> bool {
        self.first_error().is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_suites(self) -> Vec<TestSuite> {
        self.entries.into_iter().filter_map(|e| e.suite).collect()
    }
}

/// Splits a multi-document YAML stream on `---` lines. Blank documents are
/// dropped.
pub fn split_documents(content: &str) -> Vec<&str> {
    DOCUMENT_SEPARATOR
        .split(content)
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Reads and decodes a test file. Only I/O failures are returned as `Err`;
/// per-suite problems are recorded on the entries.
pub fn parse_test_suite_file(
    path: &Path,
    chart_name: &str,
    strict: bool,
    extra_values_files: &[PathBuf],
) -> Result<ParsedSuites> {
    let content = std::fs::read_to_string(path).map_err(|e| ChartCheckError::io(path, e))?;
    let decoder = SuiteDecoder {
        chart_name,
        strict,
        extra_values_files,
        base_dir: path.parent().unwrap_or_else(|| Path::new("")),
        source: path,
    };
    let parsed = decoder.decode_stream(&content);
    debug!(
        file = %path.display(),
        suites = parsed.suites().count(),
        errors = parsed.errors().count(),
        "parsed test file"
    );
    Ok(parsed)
}

/// Renders a chart whose templates produce test suites and decodes every
/// rendered document as one suite.
///
/// Snapshot ids default to the document's position within its template, and
/// each suite's source is the template inside `tests_chart`.
pub fn render_test_suite_files(
    tests_chart: &Path,
    chart_name: &str,
    strict: bool,
    extra_values_files: &[PathBuf],
    values: &Value,
    renderer: &dyn ChartRenderer,
) -> Result<ParsedSuites> {
    let chart = Chart::load(tests_chart)?;
    let release = Release::default();
    let capabilities = Capabilities::default();
    let rendered = renderer.render(&RenderRequest {
        chart: &chart,
        metadata: &chart.metadata,
        values,
        release: &release,
        capabilities: &capabilities,
        templates: &[],
    })?;

    let mut parsed = ParsedSuites::default();
    for template in rendered.iter() {
        let source = tests_chart.join(&template.name);
        let decoder = SuiteDecoder {
            chart_name,
            strict,
            extra_values_files,
            base_dir: tests_chart,
            source: &source,
        };
        for (position, document) in template.documents.iter().enumerate() {
            if document.is_null() {
                continue;
            }
            let mut entry = decoder.decode_document(document, parsed.len(), position);
            if entry.suite.as_ref().is_some_and(|s| s.name.is_empty()) {
                entry.suite = None;
                entry.errors.insert(0, ChartCheckError::MissingSuiteName);
            }
            parsed.entries.push(entry);
        }
    }
    debug!(
        chart = %tests_chart.display(),
        suites = parsed.suites().count(),
        "rendered chart-embedded test suites"
    );
    Ok(parsed)
}

impl TestSuite {
    /// Decodes the first document of `content` permissively, without the
    /// `tests`/`asserts` presence checks.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let decoder = SuiteDecoder {
            chart_name: "",
            strict: false,
            extra_values_files: &[],
            base_dir: Path::new(""),
            source: Path::new(""),
        };
        let chunk = split_documents(content).into_iter().next().unwrap_or("");
        let value: Value = serde_yaml::from_str(chunk).map_err(|source| ChartCheckError::Yaml {
            origin: "test suite".to_string(),
            source,
        })?;
        let mut unknown = Vec::new();
        let mut suite = decoder.suite(&value, 0, &mut unknown)?;
        suite.source = None;
        Ok(suite)
    }
}

// ============================================================================
// DECODER
// ============================================================================

struct SuiteDecoder<'a> {
    chart_name: &'a str,
    strict: bool,
    extra_values_files: &'a [PathBuf],
    /// Directory values-file paths are resolved against.
    base_dir: &'a Path,
    source: &'a Path,
}

impl SuiteDecoder<'_> {
    fn decode_stream(&self, content: &str) -> ParsedSuites {
        let mut parsed = ParsedSuites::default();
        for chunk in split_documents(content) {
            let index = parsed.len();
            let value: Value = match serde_yaml::from_str(chunk) {
                Ok(Value::Null) => continue,
                Ok(value) => value,
                Err(source) => {
                    parsed.entries.push(SuiteEntry {
                        source: self.source.to_path_buf(),
                        document: index,
                        suite: None,
                        errors: vec![ChartCheckError::Yaml {
                            origin: self.source.display().to_string(),
                            source,
                        }],
                    });
                    continue;
                }
            };
            parsed
                .entries
                .push(self.decode_document(&value, index, index));
        }
        parsed
    }

    fn decode_document(&self, value: &Value, document: usize, position: usize) -> SuiteEntry {
        let mut errors = Vec::new();
        let suite = match self.suite(value, position, &mut errors) {
            Ok(suite) => {
                if let Some(finding) = validate(&suite) {
                    errors.push(finding);
                }
                Some(suite)
            }
            Err(e) => {
                errors.push(e);
                None
            }
        };
        SuiteEntry {
            source: self.source.to_path_buf(),
            document,
            suite,
            errors,
        }
    }

    fn finish(&self, fields: &Fields<'_>, unknown: &mut Vec<ChartCheckError>) {
        if self.strict {
            unknown.extend(fields.unknown());
        }
    }

    fn resolve_values(&self, files: Vec<String>) -> Vec<PathBuf> {
        files
            .into_iter()
            .map(|f| {
                let path = PathBuf::from(f);
                if path.is_absolute() {
                    path
                } else {
                    self.base_dir.join(path)
                }
            })
            .collect()
    }

    fn templates(&self, raw: Vec<String>) -> Vec<String> {
        raw.iter()
            .map(|t| normalize_template(t, self.chart_name))
            .collect()
    }

    fn suite(
        &self,
        value: &Value,
        position: usize,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<TestSuite> {
        let mut f = Fields::new(value, "TestSuite")?;
        let name = f.string("suite")?.unwrap_or_default();
        let templates = self.templates(f.string_list("templates")?);
        let exclude_templates = self.templates(f.string_list("excludeTemplates")?);
        let snapshot_id = f
            .string("snapshotId")?
            .unwrap_or_else(|| position.to_string());
        let mut values = self.resolve_values(f.string_list("values")?);
        values.extend(self.extra_values_files.iter().cloned());
        let set = f.mapping("set")?.cloned().unwrap_or_default();
        let release = self.release(f.raw("release"), unknown)?;
        let capabilities = self.capabilities(f.raw("capabilities"), unknown)?;
        let chart = self.chart(f.raw("chart"), unknown)?;
        let tests = f
            .sequence("tests")?
            .iter()
            .map(|job| self.job(job, unknown))
            .collect::<Result<Vec<_>>>()?;
        self.finish(&f, unknown);

        Ok(TestSuite {
            name,
            templates,
            exclude_templates,
            snapshot_id,
            capabilities,
            chart,
            release,
            values,
            set,
            tests,
            source: Some(self.source.to_path_buf()),
        })
    }

    fn job(&self, value: &Value, unknown: &mut Vec<ChartCheckError>) -> Result<TestJob> {
        let mut f = Fields::new(value, "TestJob")?;
        let name = f.string("it")?.unwrap_or_default();
        let template = f
            .string("template")?
            .map(|t| normalize_template(&t, self.chart_name));
        let templates = self.templates(f.string_list("templates")?);
        let document_index = f.usize("documentIndex")?;
        let document_selector = self.document_selector(f.raw("documentSelector"), unknown)?;
        let release = self.release(f.raw("release"), unknown)?;
        let capabilities = self.capabilities(f.raw("capabilities"), unknown)?;
        let chart = self.chart(f.raw("chart"), unknown)?;
        let values = self.resolve_values(f.string_list("values")?);
        let set = f.mapping("set")?.cloned().unwrap_or_default();
        let skip = self.skip(f.raw("skip"), unknown)?;
        let asserts = f
            .sequence("asserts")?
            .iter()
            .map(|a| {
                let (assertion, extras) = Assertion::decode(a, self.chart_name)?;
                if self.strict {
                    unknown.extend(extras);
                }
                Ok(assertion)
            })
            .collect::<Result<Vec<_>>>()?;
        self.finish(&f, unknown);

        Ok(TestJob {
            name,
            template,
            templates,
            document_index,
            document_selector,
            capabilities,
            chart,
            release,
            values,
            set,
            skip,
            asserts,
        })
    }

    fn release(
        &self,
        value: Option<&Value>,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<ReleaseOverride> {
        let Some(value) = value else {
            return Ok(ReleaseOverride::default());
        };
        let mut f = Fields::new(value, "Release")?;
        let release = ReleaseOverride {
            name: f.field_string("name")?,
            namespace: f.field_string("namespace")?,
            revision: f.field_u32("revision")?,
            upgrade: f.field_bool("upgrade")?,
        };
        self.finish(&f, unknown);
        Ok(release)
    }

    fn capabilities(
        &self,
        value: Option<&Value>,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<CapabilitiesOverride> {
        let Some(value) = value else {
            return Ok(CapabilitiesOverride::default());
        };
        let mut f = Fields::new(value, "Capabilities")?;
        let capabilities = CapabilitiesOverride {
            major_version: f.field_string("majorVersion")?,
            minor_version: f.field_string("minorVersion")?,
            api_versions: f.field_string_list("apiVersions")?,
        };
        self.finish(&f, unknown);
        Ok(capabilities)
    }

    fn chart(
        &self,
        value: Option<&Value>,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<ChartOverride> {
        let Some(value) = value else {
            return Ok(ChartOverride::default());
        };
        let mut f = Fields::new(value, "Chart")?;
        let chart = ChartOverride {
            version: f.field_string("version")?,
            app_version: f.field_string("appVersion")?,
        };
        self.finish(&f, unknown);
        Ok(chart)
    }

    fn document_selector(
        &self,
        value: Option<&Value>,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<Option<DocumentSelector>> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        let mut f = Fields::new(value, "DocumentSelector")?;
        let path = f.string("path")?.unwrap_or_default();
        let selector = DocumentSelector {
            path: DocPath::parse(&path)?,
            value: f.raw("value").cloned().unwrap_or(Value::Null),
        };
        self.finish(&f, unknown);
        Ok(Some(selector))
    }

    fn skip(
        &self,
        value: Option<&Value>,
        unknown: &mut Vec<ChartCheckError>,
    ) -> Result<Option<String>> {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
            Some(Value::Bool(true)) => Ok(Some(String::new())),
            Some(value) => {
                let mut f = Fields::new(value, "Skip")?;
                let reason = f.string("reason")?.unwrap_or_default();
                self.finish(&f, unknown);
                Ok(Some(reason))
            }
        }
    }
}

/// Required-content checks applied after a suite decoded.
fn validate(suite: &TestSuite) -> Option<ChartCheckError> {
    if suite.tests.is_empty() {
        return Some(ChartCheckError::NoTests);
    }
    suite
        .tests
        .iter()
        .any(|job| job.asserts.is_empty() && job.skip.is_none())
        .then_some(ChartCheckError::NoAsserts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    fn decode(src: &str, strict: bool) -> ParsedSuites {
        SuiteDecoder {
            chart_name: "basic",
            strict,
            extra_values_files: &[],
            base_dir: Path::new("chart/tests"),
            source: Path::new("chart/tests/a_test.yaml"),
        }
        .decode_stream(src)
    }

    #[test]
    fn splits_on_separator_lines_only() {
        let docs = split_documents("a: 1\n---\nb: '---'\n--- # comment\n\n---\nc: 3\n");
        assert_eq!(docs.len(), 3);
        assert!(docs[1].contains("'---'"));
    }

    #[test]
    fn decodes_suite_fields() {
        let parsed = decode(
            r#"
suite: test deployment
templates:
  - deployment.yaml
values:
  - ./values/image.yaml
set:
  image.tag: latest
release:
  name: my-release
  revision: 9
capabilities:
  majorVersion: 1
  apiVersions:
    - br.dev.local/v2
tests:
  - it: should pass
    documentIndex: 1
    capabilities:
      apiVersions: null
    asserts:
      - isKind:
          of: Deployment
"#,
            true,
        );
        assert!(parsed.is_clean(), "{:?}", parsed.first_error());
        let suite = parsed.suites().next().unwrap();
        assert_eq!(suite.name, "test deployment");
        assert_eq!(suite.templates, ["templates/deployment.yaml"]);
        assert_eq!(suite.values, [PathBuf::from("chart/tests/./values/image.yaml")]);
        assert_eq!(suite.snapshot_id, "0");
        assert_eq!(suite.release.name, Field::Value("my-release".into()));
        assert_eq!(suite.release.revision, Field::Value(9));
        assert_eq!(suite.capabilities.major_version, Field::Value("1".into()));
        assert_eq!(suite.capabilities.minor_version, Field::Absent);
        let job = &suite.tests[0];
        assert_eq!(job.document_index, Some(1));
        assert_eq!(job.capabilities.api_versions, Field::Null);
        assert_eq!(job.asserts[0].assert_type, "isKind");
    }

    #[test]
    fn strict_mode_reports_unknown_fields_but_keeps_suites() {
        let src = "suite: a\ntests:\n  - it: x\n    documents: 1\n    asserts:\n      - isNull: {path: a}\n---\nsuite: b\ntests:\n  - it: y\n    asserts:\n      - isNull: {path: a}\n";
        let permissive = decode(src, false);
        assert!(permissive.is_clean());

        let strict = decode(src, true);
        assert_eq!(strict.suites().count(), 2);
        assert_eq!(
            strict.first_error().unwrap().to_string(),
            "field documents not found in type TestJob"
        );
    }

    #[test]
    fn strict_mode_reports_extra_assertion_keys() {
        let src = "suite: a\ntests:\n  - it: x\n    asserts:\n      - isNull: {path: a}\n        description: documented\n";
        let permissive = decode(src, false);
        assert!(permissive.is_clean());
        assert_eq!(permissive.suites().next().unwrap().tests[0].asserts[0].assert_type, "isNull");

        let strict = decode(src, true);
        assert_eq!(strict.suites().count(), 1);
        assert_eq!(
            strict.first_error().unwrap().to_string(),
            "field description not found in type Assertion"
        );
    }

    #[test]
    fn validation_findings_keep_the_suite() {
        let parsed = decode("suite: empty\n", false);
        assert_eq!(parsed.suites().count(), 1);
        assert!(matches!(parsed.first_error(), Some(ChartCheckError::NoTests)));

        let parsed = decode("suite: s\ntests:\n  - it: nothing\n", false);
        assert_eq!(parsed.suites().count(), 1);
        assert!(matches!(parsed.first_error(), Some(ChartCheckError::NoAsserts)));
    }

    #[test]
    fn assertion_errors_drop_the_suite() {
        let parsed = decode(
            "suite: s\ntests:\n  - it: x\n    asserts:\n      - notAThing: {}\n---\nsuite: ok\ntests:\n  - it: y\n    asserts:\n      - isNull: {path: a}\n",
            false,
        );
        assert_eq!(parsed.len(), 2);
        assert!(parsed.entries[0].suite.is_none());
        assert_eq!(
            parsed.entries[0].errors[0].to_string(),
            "assertion type `notAThing` is invalid"
        );
        assert_eq!(parsed.entries[1].suite.as_ref().unwrap().snapshot_id, "1");
    }

    #[test]
    fn skip_and_selector_are_decoded() {
        let parsed = decode(
            "suite: s\ntests:\n  - it: later\n    skip:\n      reason: flaky\n  - it: pick\n    documentSelector:\n      path: metadata.name\n      value: b\n    asserts:\n      - isKind: {of: Service}\n",
            true,
        );
        assert!(parsed.is_clean(), "{:?}", parsed.first_error());
        let suite = parsed.suites().next().unwrap();
        assert_eq!(suite.tests[0].skip.as_deref(), Some("flaky"));
        let selector = suite.tests[1].document_selector.as_ref().unwrap();
        assert_eq!(selector.path.to_string(), "metadata.name");
        assert_eq!(selector.value, Value::from("b"));
    }

    #[test]
    fn from_yaml_is_permissive() {
        let suite = TestSuite::from_yaml("suite: only a name\nunknown: 1\n").unwrap();
        assert_eq!(suite.name, "only a name");
        assert!(suite.tests.is_empty());
    }
}
