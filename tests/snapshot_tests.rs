//! `matchSnapshot` across runs: the snapshot file next to a test file is
//! created, compared against, and rewritten in update mode.

mod common;

use std::path::Path;

use chartcheck::config::RunnerConfig;
use chartcheck::results::FileRunResult;
use chartcheck::runner::run_test_file;
use chartcheck::snapshot::SnapshotCounting;
use chartcheck::ChartCheckError;
use common::{basic_chart, basic_renderer, write};

const BOTH: &str = r#"
suite: snapshots
templates: [deployment.yaml, service.yaml]
tests:
  - it: deployment
    template: deployment.yaml
    set:
      replicaCount: REPLICAS
    asserts:
      - matchSnapshot: {}
  - it: service spec
    template: service.yaml
    asserts:
      - matchSnapshot:
          path: spec
"#;

const DEPLOYMENT_ONLY: &str = r#"
suite: snapshots
templates: [deployment.yaml]
tests:
  - it: deployment
    set:
      replicaCount: REPLICAS
    asserts:
      - matchSnapshot: {}
"#;

fn run(root: &Path, suite: &str, replicas: u32, update: bool) -> FileRunResult {
    let chart = basic_chart(root);
    let file = write(
        root,
        "tests/snap_test.yaml",
        &suite.replace("REPLICAS", &replicas.to_string()),
    );
    let config = RunnerConfig {
        use_colors: false,
        update_snapshots: update,
        ..Default::default()
    };
    run_test_file(&file, &chart, &config, &basic_renderer()).unwrap()
}

fn snapshot_file(root: &Path) -> String {
    std::fs::read_to_string(root.join("tests/__snapshot__/snap_test.yaml.snap")).unwrap()
}

#[test]
fn first_run_records_and_second_run_matches() {
    let dir = tempfile::tempdir().unwrap();

    let first = run(dir.path(), BOTH, 1, false);
    assert!(first.passed(), "{:#?}", first);
    assert!(first.snapshot_written);
    assert_eq!(
        first.suites[0].snapshot_counting,
        SnapshotCounting {
            created: 2,
            total: 2,
            failed: 0,
            vanished: 0
        }
    );
    let recorded = snapshot_file(dir.path());
    assert!(recorded.contains("kind: Deployment"));
    assert!(recorded.contains("port: 80"));

    let second = run(dir.path(), BOTH, 1, false);
    assert!(second.passed(), "{:#?}", second);
    assert!(!second.snapshot_written);
    assert_eq!(second.suites[0].snapshot_counting.created, 0);
    assert_eq!(second.suites[0].snapshot_counting.total, 2);
    assert_eq!(snapshot_file(dir.path()), recorded);
}

#[test]
fn changed_render_fails_until_updated() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), BOTH, 1, false);
    let recorded = snapshot_file(dir.path());

    let changed = run(dir.path(), BOTH, 7, false);
    let suite = &changed.suites[0];
    assert!(!suite.passed);
    assert_eq!(suite.snapshot_counting.failed, 1);
    assert!(!suite.tests_result[0].passed);
    assert!(suite.tests_result[1].passed);
    let info = &suite.tests_result[0].assertions_result[0].fail_info;
    assert!(info.contains(&"Expected to match snapshot 0:".to_string()));
    assert!(info.contains(&"\t-  replicas: 1".to_string()), "{:#?}", info);
    assert!(info.contains(&"\t+  replicas: 7".to_string()), "{:#?}", info);
    assert!(!changed.snapshot_written);
    assert_eq!(snapshot_file(dir.path()), recorded);

    let updated = run(dir.path(), BOTH, 7, true);
    assert!(updated.passed(), "{:#?}", updated);
    assert_eq!(updated.suites[0].snapshot_counting.failed, 0);
    assert!(updated.snapshot_written);
    assert!(snapshot_file(dir.path()).contains("replicas: 7"));

    assert!(run(dir.path(), BOTH, 7, false).passed());
}

#[test]
fn vanished_snapshots_fail_the_suite_until_updated() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), BOTH, 1, false);

    let fewer = run(dir.path(), DEPLOYMENT_ONLY, 1, false);
    let suite = &fewer.suites[0];
    assert!(suite.tests_result.iter().all(|job| job.passed));
    assert_eq!(suite.snapshot_counting.vanished, 1);
    assert!(!suite.passed);
    assert!(!fewer.snapshot_written);

    let updated = run(dir.path(), DEPLOYMENT_ONLY, 1, true);
    assert!(updated.passed(), "{:#?}", updated);
    assert_eq!(updated.suites[0].snapshot_counting.vanished, 1);
    assert!(updated.snapshot_written);
    assert!(!snapshot_file(dir.path()).contains("port: 80"));

    let clean = run(dir.path(), DEPLOYMENT_ONLY, 1, false);
    assert!(clean.passed());
    assert_eq!(clean.suites[0].snapshot_counting.vanished, 0);
    assert_eq!(clean.suites[0].snapshot_counting.total, 1);
}

#[test]
fn corrupt_snapshot_file_aborts_the_test_file() {
    let dir = tempfile::tempdir().unwrap();
    let chart = basic_chart(dir.path());
    let file = write(dir.path(), "tests/snap_test.yaml", &BOTH.replace("REPLICAS", "1"));
    write(
        dir.path(),
        "tests/__snapshot__/snap_test.yaml.snap",
        "- not\n- a mapping\n",
    );
    let renderer = basic_renderer();
    let config = RunnerConfig {
        use_colors: false,
        ..Default::default()
    };
    let err = run_test_file(&file, &chart, &config, &renderer).unwrap_err();
    assert!(matches!(err, ChartCheckError::SnapshotFormat { .. }), "{:?}", err);
    assert!(renderer.requests.borrow().is_empty());
}
