//! Result records produced by the runner.
//!
//! Results are plain data: assertion failures live here as `fail_info`
//! lines, never as errors. Everything serialises for `--output-file`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub use crate::snapshot::SnapshotCounting;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionResult {
    pub index: usize,
    pub assert_type: String,
    pub not: bool,
    pub passed: bool,
    pub fail_info: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TestJobResult {
    pub display_name: String,
    pub passed: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_error: Option<String>,
    pub assertions_result: Vec<AssertionResult>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl TestJobResult {
    pub fn failed_assertions(&self) -> impl Iterator<Item = &AssertionResult> {
        self.assertions_result.iter().filter(|a| !a.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TestSuiteResult {
    pub display_name: String,
    pub file_path: PathBuf,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_error: Option<String>,
    pub tests_result: Vec<TestJobResult>,
    pub snapshot_counting: SnapshotCounting,
}

/// Everything one test file produced.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FileRunResult {
    pub file_path: PathBuf,
    pub suites: Vec<TestSuiteResult>,
    /// Snapshot ids present in the snapshot file that no suite used.
    pub orphaned_namespaces: Vec<String>,
    pub snapshot_written: bool,
}

impl FileRunResult {
    pub fn passed(&self) -> bool {
        self.suites.iter().all(|s| s.passed)
    }
}

/// Totals across files, for the closing summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub suites_passed: usize,
    pub suites_failed: usize,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub tests_skipped: usize,
    /// Test files that could not be run at all.
    pub file_errors: usize,
    pub snapshots: SnapshotCounting,
}

impl RunSummary {
    pub fn record(&mut self, file: &FileRunResult) {
        for suite in &file.suites {
            if suite.passed {
                self.suites_passed += 1;
            } else {
                self.suites_failed += 1;
            }
            for job in &suite.tests_result {
                match (job.skipped, job.passed) {
                    (true, _) => self.tests_skipped += 1,
                    (false, true) => self.tests_passed += 1,
                    (false, false) => self.tests_failed += 1,
                }
            }
            self.snapshots.add(&suite.snapshot_counting);
        }
    }

    pub fn passed(&self) -> bool {
        self.suites_failed == 0 && self.file_errors == 0
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_jobs_and_suites() {
        let file = FileRunResult {
            suites: vec![
                TestSuiteResult {
                    passed: true,
                    tests_result: vec![
                        TestJobResult {
                            passed: true,
                            ..Default::default()
                        },
                        TestJobResult {
                            passed: true,
                            skipped: true,
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                TestSuiteResult {
                    passed: false,
                    tests_result: vec![TestJobResult::default()],
                    snapshot_counting: SnapshotCounting {
                        created: 1,
                        total: 2,
                        failed: 1,
                        vanished: 0,
                    },
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let mut summary = RunSummary::default();
        summary.record(&file);
        assert_eq!(summary.suites_passed, 1);
        assert_eq!(summary.suites_failed, 1);
        assert_eq!(summary.tests_passed, 1);
        assert_eq!(summary.tests_skipped, 1);
        assert_eq!(summary.tests_failed, 1);
        assert_eq!(summary.snapshots.total, 2);
        assert!(!summary.passed());
    }

    #[test]
    fn serialises_to_json() {
        let job = TestJobResult {
            display_name: "renders".into(),
            passed: true,
            duration: Duration::from_millis(12),
            ..Default::default()
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["duration"], 12);
        assert!(json.get("exec_error").is_none());
    }
}
