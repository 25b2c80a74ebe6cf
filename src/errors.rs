//! Unified error type for chartcheck.
//!
//! Suite decoding errors, values compilation failures, snapshot store I/O and
//! chart loading all surface as [`ChartCheckError`]. Assertion failures are not
//! errors: they are recorded as data on the results. Render failures have their
//! own type, [`crate::render::RenderError`], because they are consumed by
//! `failedTemplate` assertions.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Convenient alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChartCheckError>;

#[derive(Debug, Error, Diagnostic)]
pub enum ChartCheckError {
    // =============================
    // Suite decoding
    // =============================
    #[error("no tests found")]
    #[diagnostic(code(chartcheck::parse::no_tests))]
    NoTests,

    #[error("no asserts found")]
    #[diagnostic(code(chartcheck::parse::no_asserts))]
    NoAsserts,

    #[error("no assertion type defined")]
    #[diagnostic(
        code(chartcheck::parse::no_assertion_type),
        help("each entry under `asserts` needs exactly one key such as `equal` or `matchSnapshot`")
    )]
    NoAssertionType,

    #[error("assertion type `{key}` is invalid")]
    #[diagnostic(code(chartcheck::parse::invalid_assertion_type))]
    InvalidAssertionType { key: String },

    #[error("assertion type `{first}` and `{second}` is declared duplicately")]
    #[diagnostic(code(chartcheck::parse::duplicate_assertion_type))]
    DuplicateAssertionType { first: String, second: String },

    #[error("invalid parameters for `{assert_type}`: {source}")]
    #[diagnostic(code(chartcheck::parse::assertion_params))]
    AssertionParams {
        assert_type: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("field {field} not found in type {type_name}")]
    #[diagnostic(code(chartcheck::parse::unknown_field))]
    UnknownField {
        field: String,
        type_name: &'static str,
    },

    #[error("field {field} in type {type_name} must be {expected}")]
    #[diagnostic(code(chartcheck::parse::field_type))]
    FieldType {
        field: String,
        type_name: &'static str,
        expected: &'static str,
    },

    #[error("helm chart based test suites must include `suite` field")]
    #[diagnostic(code(chartcheck::parse::missing_suite_name))]
    MissingSuiteName,

    #[error("invalid YAML in {origin}: {source}")]
    #[diagnostic(code(chartcheck::parse::yaml))]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    // =============================
    // Values and paths
    // =============================
    #[error("invalid path `{path}`: {reason}")]
    #[diagnostic(code(chartcheck::path))]
    InvalidPath { path: String, reason: String },

    #[error("cannot set `{path}`: {reason}")]
    #[diagnostic(code(chartcheck::values::set))]
    ValuesSet { path: String, reason: String },

    // =============================
    // Filesystem
    // =============================
    #[error("failed to access {}: {source}", path.display())]
    #[diagnostic(code(chartcheck::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern `{pattern}`: {source}")]
    #[diagnostic(code(chartcheck::discovery::pattern))]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to walk {}: {source}", path.display())]
    #[diagnostic(code(chartcheck::discovery::walk))]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid chart at {}: {reason}", path.display())]
    #[diagnostic(code(chartcheck::chart))]
    Chart { path: PathBuf, reason: String },

    // =============================
    // Snapshots
    // =============================
    #[error("corrupt snapshot file {}: {source}", path.display())]
    #[diagnostic(
        code(chartcheck::snapshot::format),
        help("delete the file or rerun with --update-snapshot to regenerate it")
    )]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode {what}: {source}")]
    #[diagnostic(code(chartcheck::encode))]
    Encode {
        what: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write results to {}: {source}", path.display())]
    #[diagnostic(code(chartcheck::report))]
    Report {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // =============================
    // Rendering
    // =============================
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] crate::render::RenderError),
}

impl ChartCheckError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
