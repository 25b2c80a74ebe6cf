//! Run configuration shared by the runner and the CLI.

use std::path::PathBuf;

use crate::discovery::DEFAULT_TEST_PATTERN;

/// Configuration for test execution and reporting.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Report unknown suite fields as errors.
    pub strict: bool,
    /// Rewrite snapshot files with what this run observed.
    pub update_snapshots: bool,
    pub with_subcharts: bool,
    /// Values files appended to every suite.
    pub values_files: Vec<PathBuf>,
    /// Test file globs, relative to each chart root.
    pub file_patterns: Vec<String>,
    /// Chart-relative directory of a chart whose templates render to suites.
    pub chart_tests_path: Option<PathBuf>,
    pub use_colors: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            update_snapshots: false,
            with_subcharts: false,
            values_files: Vec::new(),
            file_patterns: vec![DEFAULT_TEST_PATTERN.to_string()],
            chart_tests_path: None,
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}
