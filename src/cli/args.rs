//! Command-line arguments for `chartcheck`, declared with `clap` derive.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::RunnerConfig;
use crate::discovery::DEFAULT_TEST_PATTERN;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "chartcheck",
    version,
    about = "Declarative unit tests for Helm chart templates."
)]
pub struct ChartCheckArgs {
    /// Chart directories to test.
    #[arg(required = true)]
    pub charts: Vec<PathBuf>,

    /// Glob of test files, relative to the chart root. Repeatable.
    #[arg(short = 'f', long = "file", default_value = DEFAULT_TEST_PATTERN)]
    pub file: Vec<String>,

    /// Rewrite snapshot files with the output of this run.
    #[arg(short = 'u', long = "update-snapshot")]
    pub update_snapshot: bool,

    /// Fail suites that contain unknown fields.
    #[arg(long)]
    pub strict: bool,

    /// Extra values files applied to every suite. Repeatable.
    #[arg(short = 'v', long = "values")]
    pub values: Vec<PathBuf>,

    /// Also run the tests of charts under `charts/`.
    #[arg(short = 's', long = "with-subchart")]
    pub with_subchart: bool,

    /// Chart-relative path of a chart whose templates render to test suites.
    #[arg(long = "chart-tests-path")]
    pub chart_tests_path: Option<PathBuf>,

    /// The helm binary used to render charts.
    #[arg(long, default_value = "helm")]
    pub helm: PathBuf,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Write results as JSON to this file.
    #[arg(short = 'o', long = "output-file")]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl From<&ChartCheckArgs> for RunnerConfig {
    fn from(args: &ChartCheckArgs) -> Self {
        let defaults = RunnerConfig::default();
        Self {
            strict: args.strict,
            update_snapshots: args.update_snapshot,
            with_subcharts: args.with_subchart,
            values_files: args.values.clone(),
            file_patterns: args.file.clone(),
            chart_tests_path: args.chart_tests_path.clone(),
            use_colors: match args.color {
                ColorMode::Auto => defaults.use_colors,
                ColorMode::Always => true,
                ColorMode::Never => false,
            },
        }
    }
}
