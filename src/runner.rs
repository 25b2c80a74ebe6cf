//! # Test Runner
//!
//! Drives test files end to end: decode suites, run each suite's jobs
//! against the chart, and persist the snapshot cache once the file is done.
//!
//! Everything is sequential. One [`SnapshotCache`] belongs to one test file
//! for the duration of its run; job order and `matchSnapshot` order inside a
//! suite are declaration order, which keeps occurrence keys stable.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::errors::Result;
use crate::parser::{parse_test_suite_file, render_test_suite_files, SuiteEntry};
use crate::render::{Chart, ChartRenderer};
use crate::results::{FileRunResult, TestSuiteResult};
use crate::snapshot::SnapshotCache;

pub mod job;
pub mod suite;

pub use job::run_job;
pub use suite::run_suite;

/// Decodes and runs one test file against `chart`.
///
/// Suites that failed to decode are reported as failed results and are not
/// run. Snapshot store errors abort the file.
pub fn run_test_file(
    path: &Path,
    chart: &Chart,
    config: &RunnerConfig,
    renderer: &dyn ChartRenderer,
) -> Result<FileRunResult> {
    info!(file = %path.display(), chart = %chart.metadata.name, "running test file");
    let parsed = parse_test_suite_file(
        path,
        &chart.metadata.name,
        config.strict,
        &config.values_files,
    )?;
    run_entries(path, parsed.entries, chart, config, renderer)
}

/// Renders the chart of test suites at `tests_chart` and runs the suites it
/// produces, one result per rendered template.
pub fn run_chart_tests(
    tests_chart: &Path,
    chart: &Chart,
    config: &RunnerConfig,
    renderer: &dyn ChartRenderer,
) -> Result<Vec<FileRunResult>> {
    info!(tests_chart = %tests_chart.display(), "rendering chart-embedded test suites");
    let values = Value::Mapping(Mapping::new());
    let parsed = render_test_suite_files(
        tests_chart,
        &chart.metadata.name,
        config.strict,
        &config.values_files,
        &values,
        renderer,
    )?;

    let mut groups: Vec<(PathBuf, Vec<SuiteEntry>)> = Vec::new();
    for entry in parsed.entries {
        match groups.iter_mut().find(|(source, _)| *source == entry.source) {
            Some((_, entries)) => entries.push(entry),
            None => groups.push((entry.source.clone(), vec![entry])),
        }
    }
    groups
        .into_iter()
        .map(|(source, entries)| run_entries(&source, entries, chart, config, renderer))
        .collect()
}

/// Runs decoded entries that share one snapshot file.
pub fn run_entries(
    source: &Path,
    entries: Vec<SuiteEntry>,
    chart: &Chart,
    config: &RunnerConfig,
    renderer: &dyn ChartRenderer,
) -> Result<FileRunResult> {
    let snapshot_path = SnapshotCache::path_for_test_file(source);
    let mut cache = SnapshotCache::load(&snapshot_path, config.update_snapshots)?;

    let mut suites = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.errors.is_empty() {
            if let Some(suite) = &entry.suite {
                suites.push(run_suite(suite, chart, config, renderer, &mut cache));
                continue;
            }
        }
        suites.push(failed_entry(&entry, &mut cache));
    }

    let orphaned_namespaces = cache.orphaned_namespaces();
    if !orphaned_namespaces.is_empty() {
        warn!(
            file = %source.display(),
            namespaces = ?orphaned_namespaces,
            "snapshot file holds namespaces no suite used"
        );
    }
    let snapshot_written = cache.store()?;

    Ok(FileRunResult {
        file_path: source.to_path_buf(),
        suites,
        orphaned_namespaces,
        snapshot_written,
    })
}

/// Result for an entry that cannot run. Its snapshots are kept as they are.
fn failed_entry(entry: &SuiteEntry, cache: &mut SnapshotCache) -> TestSuiteResult {
    if let Some(suite) = &entry.suite {
        cache.keep_namespace(&suite.snapshot_id);
    }
    let message = entry
        .errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    warn!(
        file = %entry.source.display(),
        document = entry.document,
        error = %message,
        "test suite could not be run"
    );
    TestSuiteResult {
        display_name: entry
            .suite
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("{} #{}", entry.source.display(), entry.document)),
        file_path: entry.source.clone(),
        passed: false,
        exec_error: Some(message),
        tests_result: Vec::new(),
        snapshot_counting: Default::default(),
    }
}
