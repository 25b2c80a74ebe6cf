//! The chartcheck Command-Line Interface.
//!
//! Wires argument parsing, logging, discovery, the runner and output
//! together. Errors that stop a whole test file are printed and counted;
//! anything that stops the run itself is rendered with miette.

use std::path::Path;
use std::process;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::args::ChartCheckArgs;
use crate::cli::output::Printer;
use crate::config::RunnerConfig;
use crate::discovery::{discover_charts, get_files};
use crate::errors::{ChartCheckError, Result};
use crate::render::{Chart, HelmRenderer};
use crate::results::{FileRunResult, RunSummary};
use crate::runner::{run_chart_tests, run_test_file};

pub mod args;
pub mod output;

/// Environment variable holding the log filter, e.g. `chartcheck=debug`.
pub const LOG_ENV: &str = "CHARTCHECK_LOG";

/// The main entry point for the CLI.
pub fn run() {
    init_tracing();
    let args = ChartCheckArgs::parse();

    match execute(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary,
    files: &'a [FileRunResult],
}

/// Runs every chart named on the command line. Returns whether everything
/// passed.
pub fn execute(args: &ChartCheckArgs) -> Result<bool> {
    let config = RunnerConfig::from(args);
    let renderer = HelmRenderer::new(&args.helm);
    let mut printer = Printer::new(config.use_colors);
    let mut summary = RunSummary::default();
    let mut files = Vec::new();

    for root in &args.charts {
        for chart_dir in discover_charts(root, config.with_subcharts)? {
            let chart = Chart::load(&chart_dir)?;
            printer.chart(&chart);
            info!(chart = %chart.metadata.name, path = %chart_dir.display(), "testing chart");

            for file in get_files(&chart_dir, &config.file_patterns)? {
                let outcome = run_test_file(&file, &chart, &config, &renderer).map(|r| vec![r]);
                record(outcome, &file, &mut printer, &mut summary, &mut files);
            }
            if let Some(rel) = &config.chart_tests_path {
                let tests_chart = chart_dir.join(rel);
                let outcome = run_chart_tests(&tests_chart, &chart, &config, &renderer);
                record(outcome, &tests_chart, &mut printer, &mut summary, &mut files);
            }
        }
    }

    printer.summary(&summary, config.update_snapshots);
    if let Some(path) = &args.output_file {
        write_report(path, &summary, &files)?;
    }
    Ok(summary.passed())
}

fn record(
    outcome: Result<Vec<FileRunResult>>,
    path: &Path,
    printer: &mut Printer,
    summary: &mut RunSummary,
    files: &mut Vec<FileRunResult>,
) {
    match outcome {
        Ok(results) => {
            for result in results {
                printer.file(&result);
                summary.record(&result);
                files.push(result);
            }
        }
        Err(e) => {
            error!(file = %path.display(), error = %e, "test file aborted");
            printer.file_error(path, &e);
            summary.file_errors += 1;
        }
    }
}

fn write_report(path: &Path, summary: &RunSummary, files: &[FileRunResult]) -> Result<()> {
    let report = JsonReport { summary, files };
    let json = serde_json::to_string_pretty(&report).map_err(|source| ChartCheckError::Report {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|e| ChartCheckError::io(path, e))
}
