//! # Snapshot Cache
//!
//! One cache per test file, persisted next to it as
//! `__snapshot__/<test file name>.snap`. The file maps a suite's snapshot id
//! to its occurrences, and each occurrence key to the recorded content:
//!
//! ```yaml
//! "0":
//!   "0": |
//!     apiVersion: v1
//!     kind: Service
//! ```
//!
//! The cache is read once when a test file starts and written at most once
//! when it ends. Occurrence keys come from a [`SnapshotCursor`], a counter
//! scoped to one suite run and advanced in declaration order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{ChartCheckError, Result};

type Namespace = BTreeMap<String, String>;
type Store = BTreeMap<String, Namespace>;

pub const SNAPSHOT_DIR: &str = "__snapshot__";

/// Snapshot statistics for one suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotCounting {
    pub created: u32,
    pub total: u32,
    pub failed: u32,
    pub vanished: u32,
}

impl SnapshotCounting {
    pub fn add(&mut self, other: &SnapshotCounting) {
        self.created += other.created;
        self.total += other.total;
        self.failed += other.failed;
        self.vanished += other.vanished;
    }
}

/// What happened when one occurrence was compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// No prior entry; the content was recorded.
    Created { key: String },
    Matched { key: String },
    /// Mismatch overwritten in update mode.
    Updated { key: String, previous: String },
    Mismatched { key: String, expected: String },
}

impl SnapshotOutcome {
    pub fn passed(&self) -> bool {
        !matches!(self, SnapshotOutcome::Mismatched { .. })
    }

    pub fn key(&self) -> &str {
        match self {
            SnapshotOutcome::Created { key }
            | SnapshotOutcome::Matched { key }
            | SnapshotOutcome::Updated { key, .. }
            | SnapshotOutcome::Mismatched { key, .. } => key,
        }
    }
}

/// Something `matchSnapshot` can compare content against.
pub trait SnapshotComparer {
    fn compare(&mut self, content: &str) -> SnapshotOutcome;
}

/// Persistent snapshot store of one test file.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    path: Option<PathBuf>,
    update: bool,
    stored: Store,
    /// What the file will contain after this run.
    next: Store,
    visited: BTreeSet<(String, String)>,
}

impl SnapshotCache {
    /// Snapshot file location for a test file.
    pub fn path_for_test_file(test_file: &Path) -> PathBuf {
        let name = test_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "suite".to_string());
        test_file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(SNAPSHOT_DIR)
            .join(format!("{}.snap", name))
    }

    /// Loads the snapshot file at `path`; a missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>, update: bool) -> Result<Self> {
        let path = path.into();
        let stored: Store = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Store::new(),
            Ok(content) => serde_yaml::from_str::<Option<Store>>(&content)
                .map_err(|source| ChartCheckError::SnapshotFormat {
                    path: path.clone(),
                    source,
                })?
                .unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Store::new(),
            Err(e) => return Err(ChartCheckError::io(&path, e)),
        };
        debug!(path = %path.display(), namespaces = stored.len(), "loaded snapshot cache");
        Ok(Self::from_store(Some(path), stored, update))
    }

    /// A cache that is never persisted.
    pub fn in_memory(update: bool) -> Self {
        Self::from_store(None, Store::new(), update)
    }

    fn from_store(path: Option<PathBuf>, stored: Store, update: bool) -> Self {
        let next = if update { Store::new() } else { stored.clone() };
        Self {
            path,
            update,
            stored,
            next,
            visited: BTreeSet::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compares `content` with the entry stored under (`snapshot_id`, `key`).
    pub fn compare(&mut self, snapshot_id: &str, key: &str, content: &str) -> SnapshotOutcome {
        self.visited.insert((snapshot_id.to_string(), key.to_string()));
        let key_owned = key.to_string();
        let previous = self
            .stored
            .get(snapshot_id)
            .and_then(|ns| ns.get(key))
            .cloned();

        let outcome = match previous {
            None => SnapshotOutcome::Created { key: key_owned },
            Some(expected) if expected == content => SnapshotOutcome::Matched { key: key_owned },
            Some(previous) if self.update => SnapshotOutcome::Updated {
                key: key_owned,
                previous,
            },
            Some(expected) => SnapshotOutcome::Mismatched {
                key: key_owned,
                expected,
            },
        };

        let record = match &outcome {
            SnapshotOutcome::Created { .. } | SnapshotOutcome::Updated { .. } => true,
            SnapshotOutcome::Matched { .. } => self.update,
            SnapshotOutcome::Mismatched { .. } => false,
        };
        if record {
            self.next
                .entry(snapshot_id.to_string())
                .or_default()
                .insert(key.to_string(), content.to_string());
        }
        outcome
    }

    /// Carries a namespace over unchanged, for suites that could not run.
    pub fn keep_namespace(&mut self, snapshot_id: &str) {
        let Some(stored) = self.stored.get(snapshot_id) else {
            return;
        };
        for key in stored.keys() {
            self.visited
                .insert((snapshot_id.to_string(), key.clone()));
        }
        self.next.insert(snapshot_id.to_string(), stored.clone());
    }

    /// Stored keys of `snapshot_id` that were not compared in this run.
    pub fn vanished(&self, snapshot_id: &str) -> Vec<String> {
        self.stored
            .get(snapshot_id)
            .map(|ns| {
                ns.keys()
                    .filter(|key| {
                        !self
                            .visited
                            .contains(&(snapshot_id.to_string(), (*key).clone()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stored snapshot ids no suite touched during this run.
    pub fn orphaned_namespaces(&self) -> Vec<String> {
        self.stored
            .keys()
            .filter(|id| !self.visited.iter().any(|(visited, _)| visited == *id))
            .cloned()
            .collect()
    }

    /// True when writing the cache would change the file.
    pub fn is_dirty(&self) -> bool {
        self.next != self.stored
    }

    /// Writes the cache back if anything changed. Returns whether a write
    /// happened.
    pub fn store(&self) -> Result<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !self.is_dirty() {
            return Ok(false);
        }
        if self.next.is_empty() && !path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChartCheckError::io(parent, e))?;
        }
        let content = serde_yaml::to_string(&self.next).map_err(|source| ChartCheckError::Encode {
            what: "snapshot cache",
            source,
        })?;
        std::fs::write(path, content).map_err(|e| ChartCheckError::io(path, e))?;
        debug!(path = %path.display(), "wrote snapshot cache");
        Ok(true)
    }
}

/// Hands out occurrence keys for one suite run and counts outcomes.
///
/// Keys are `0, 1, 2, ...` in the order `matchSnapshot` assertions are
/// evaluated, so they are stable only while job and assertion order is.
pub struct SnapshotCursor<'c> {
    cache: &'c mut SnapshotCache,
    snapshot_id: String,
    next_occurrence: u32,
    counting: SnapshotCounting,
}

impl<'c> SnapshotCursor<'c> {
    pub fn new(cache: &'c mut SnapshotCache, snapshot_id: impl Into<String>) -> Self {
        Self {
            cache,
            snapshot_id: snapshot_id.into(),
            next_occurrence: 0,
            counting: SnapshotCounting::default(),
        }
    }

    /// Ends the suite run, adding vanished entries to the counts.
    pub fn finish(self) -> SnapshotCounting {
        let vanished = self.cache.vanished(&self.snapshot_id);
        let mut counting = self.counting;
        counting.vanished = vanished.len() as u32;
        if !vanished.is_empty() {
            warn!(
                snapshot_id = %self.snapshot_id,
                keys = ?vanished,
                "snapshots recorded earlier were not produced in this run"
            );
        }
        counting
    }
}

impl SnapshotComparer for SnapshotCursor<'_> {
    fn compare(&mut self, content: &str) -> SnapshotOutcome {
        let key = self.next_occurrence.to_string();
        self.next_occurrence += 1;
        let outcome = self.cache.compare(&self.snapshot_id, &key, content);
        self.counting.total += 1;
        match outcome {
            SnapshotOutcome::Created { .. } => self.counting.created += 1,
            SnapshotOutcome::Mismatched { .. } => self.counting.failed += 1,
            SnapshotOutcome::Matched { .. } | SnapshotOutcome::Updated { .. } => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(cache: &mut SnapshotCache, id: &str, contents: &[&str]) -> (Vec<SnapshotOutcome>, SnapshotCounting) {
        let mut cursor = SnapshotCursor::new(cache, id);
        let outcomes = contents.iter().map(|c| cursor.compare(c)).collect();
        (outcomes, cursor.finish())
    }

    #[test]
    fn path_sits_next_to_test_file() {
        assert_eq!(
            SnapshotCache::path_for_test_file(Path::new("chart/tests/service_test.yaml")),
            PathBuf::from("chart/tests/__snapshot__/service_test.yaml.snap")
        );
    }

    #[test]
    fn first_run_creates_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("__snapshot__/a_test.yaml.snap");
        let mut cache = SnapshotCache::load(&path, false).unwrap();
        let (_, counting) = run(&mut cache, "0", &["a", "b"]);
        assert_eq!(
            counting,
            SnapshotCounting {
                created: 2,
                total: 2,
                failed: 0,
                vanished: 0
            }
        );
        assert!(cache.store().unwrap());
        assert!(path.exists());
    }

    #[test]
    fn second_run_matches_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snap");
        let mut cache = SnapshotCache::load(&path, false).unwrap();
        run(&mut cache, "0", &["a", "b"]);
        cache.store().unwrap();

        let mut cache = SnapshotCache::load(&path, false).unwrap();
        let (_, counting) = run(&mut cache, "0", &["a", "b"]);
        assert_eq!(counting.created, 0);
        assert_eq!(counting.total, 2);
        assert_eq!(counting.failed, 0);
        assert!(!cache.store().unwrap());
    }

    #[test]
    fn mismatch_fails_and_keeps_old_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snap");
        let mut cache = SnapshotCache::load(&path, false).unwrap();
        run(&mut cache, "0", &["a"]);
        cache.store().unwrap();

        let mut cache = SnapshotCache::load(&path, false).unwrap();
        let (outcomes, counting) = run(&mut cache, "0", &["changed"]);
        assert_eq!(
            outcomes,
            [SnapshotOutcome::Mismatched {
                key: "0".into(),
                expected: "a".into()
            }]
        );
        assert_eq!(counting.failed, 1);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn vanished_entries_are_counted_and_dropped_on_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snap");
        let mut cache = SnapshotCache::load(&path, false).unwrap();
        run(&mut cache, "0", &["a", "b", "c"]);
        run(&mut cache, "1", &["x"]);
        cache.store().unwrap();

        let mut cache = SnapshotCache::load(&path, false).unwrap();
        let (_, counting) = run(&mut cache, "0", &["a"]);
        assert_eq!(counting.vanished, 2);
        assert_eq!(cache.orphaned_namespaces(), ["1"]);

        let mut cache = SnapshotCache::load(&path, true).unwrap();
        let (outcomes, counting) = run(&mut cache, "0", &["new"]);
        assert!(outcomes[0].passed());
        assert_eq!(counting.failed, 0);
        assert_eq!(counting.vanished, 2);
        assert!(cache.store().unwrap());

        let cache = SnapshotCache::load(&path, false).unwrap();
        assert!(cache.vanished("0").is_empty());
        assert_eq!(cache.orphaned_namespaces(), ["0"]);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("new"));
        assert!(!raw.contains("x"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.snap");
        std::fs::write(&path, "- not\n- a\n- mapping\n").unwrap();
        assert!(matches!(
            SnapshotCache::load(&path, false),
            Err(ChartCheckError::SnapshotFormat { .. })
        ));
    }

    #[test]
    fn in_memory_cache_never_writes() {
        let mut cache = SnapshotCache::in_memory(false);
        run(&mut cache, "0", &["a"]);
        assert!(cache.is_dirty());
        assert!(!cache.store().unwrap());
    }
}
