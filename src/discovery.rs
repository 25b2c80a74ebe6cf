//! Locates charts and test files on disk.
//!
//! Test files are matched with glob patterns relative to the chart root.
//! Results are de-duplicated so that overlapping patterns never run a file
//! twice, and are ordered deterministically: pattern by pattern, sorted
//! within each pattern.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{ChartCheckError, Result};

pub const CHART_MANIFEST: &str = "Chart.yaml";
pub const SUBCHARTS_DIR: &str = "charts";

/// Default test file pattern.
pub const DEFAULT_TEST_PATTERN: &str = "tests/*_test.yaml";

pub fn is_chart_dir(path: &Path) -> bool {
    path.join(CHART_MANIFEST).is_file()
}

/// Files under `root` matching any of `patterns`, each listed once.
pub fn get_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        let full = root.join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full).map_err(|source| ChartCheckError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        matched.sort();
        for path in matched {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    debug!(root = %root.display(), files = files.len(), "discovered test files");
    Ok(files)
}

/// The chart at `root`, followed by its unpacked subcharts when
/// `with_subcharts` is set.
pub fn discover_charts(root: &Path, with_subcharts: bool) -> Result<Vec<PathBuf>> {
    let mut charts = vec![root.to_path_buf()];
    if !with_subcharts {
        return Ok(charts);
    }
    let subcharts_dir = root.join(SUBCHARTS_DIR);
    if !subcharts_dir.is_dir() {
        return Ok(charts);
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(&subcharts_dir).min_depth(1) {
        let entry = entry.map_err(|source| ChartCheckError::Walk {
            path: subcharts_dir.clone(),
            source,
        })?;
        if entry.file_type().is_file() && entry.file_name() == CHART_MANIFEST {
            if let Some(dir) = entry.path().parent() {
                found.push(dir.to_path_buf());
            }
        }
    }
    found.sort();
    charts.extend(found);
    Ok(charts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn overlapping_patterns_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "tests/b_test.yaml");
        touch(dir.path(), "tests/a_test.yaml");
        touch(dir.path(), "tests/notes.txt");

        let patterns = vec!["tests/b_test.yaml".to_string(), "tests/*_test.yaml".to_string()];
        let files = get_files(dir.path(), &patterns).unwrap();
        assert_eq!(
            files,
            [
                dir.path().join("tests/b_test.yaml"),
                dir.path().join("tests/a_test.yaml"),
            ]
        );
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_files(dir.path(), &["tests/[".to_string()]).unwrap_err();
        assert!(matches!(err, ChartCheckError::Pattern { .. }));
    }

    #[test]
    fn finds_subcharts_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Chart.yaml");
        touch(dir.path(), "charts/postgresql/Chart.yaml");
        touch(dir.path(), "charts/redis/Chart.yaml");
        touch(dir.path(), "charts/redis/templates/x.yaml");

        assert_eq!(discover_charts(dir.path(), false).unwrap().len(), 1);
        let charts = discover_charts(dir.path(), true).unwrap();
        assert_eq!(
            charts,
            [
                dir.path().to_path_buf(),
                dir.path().join("charts/postgresql"),
                dir.path().join("charts/redis"),
            ]
        );
        assert!(is_chart_dir(&charts[1]));
    }
}
