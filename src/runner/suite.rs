//! Execution of one test suite against one chart.

use tracing::info;

use super::job::run_job;
use crate::config::RunnerConfig;
use crate::model::TestSuite;
use crate::render::{Chart, ChartRenderer};
use crate::results::TestSuiteResult;
use crate::snapshot::{SnapshotCache, SnapshotCursor};

/// Runs every job of `suite` in declaration order.
///
/// Snapshot occurrences are numbered per suite through a fresh cursor, so
/// the suite's snapshot id must not be shared with another suite in the same
/// file.
pub fn run_suite(
    suite: &TestSuite,
    chart: &Chart,
    config: &RunnerConfig,
    renderer: &dyn ChartRenderer,
    cache: &mut SnapshotCache,
) -> TestSuiteResult {
    let mut cursor = SnapshotCursor::new(cache, suite.snapshot_id.clone());
    let tests_result: Vec<_> = suite
        .tests
        .iter()
        .map(|job| run_job(suite, job, chart, renderer, &mut cursor))
        .collect();
    let snapshot_counting = cursor.finish();

    let passed = !tests_result.is_empty()
        && tests_result.iter().all(|job| job.passed)
        && (config.update_snapshots || snapshot_counting.vanished == 0);

    info!(
        suite = %suite.name,
        passed,
        jobs = tests_result.len(),
        snapshots = snapshot_counting.total,
        "suite finished"
    );
    TestSuiteResult {
        display_name: suite.name.clone(),
        file_path: suite.source.clone().unwrap_or_default(),
        passed,
        exec_error: None,
        tests_result,
        snapshot_counting,
    }
}
