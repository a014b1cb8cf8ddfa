//! Snapshot store and comparator
//!
//! A snapshot record is the canonical serialization of a rendered tree under
//! a small header. Records are stored one file per test id:
//!
//! ```text
//! # settle snapshot v1
//! # test: button_matches_the_snapshot
//! <button>
//!   "SUBSCRIBE TO BASIC"
//! </button>
//! ```
//!
//! The first comparison for a test id writes the baseline. Later comparisons
//! match byte-for-byte or report a line diff. Baselines are only overwritten
//! under [`UpdateMode::Always`]; under [`UpdateMode::New`] a mismatching
//! record is parked next to the baseline as `<name>.snap.new` for review.

mod diff;

pub use diff::{DiffLine, SnapshotDiff};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::{HarnessConfig, UpdateMode};
use crate::constants::record::{EXTENSION, HEADER, PENDING_EXTENSION, TEST_PREFIX};
use crate::error::{HarnessError, Result};
use crate::tree::RenderedTree;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]+").expect("valid regex"));

/// Outcome of comparing a tree against its baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// No baseline existed; one was written
    Created,
    /// Byte-identical to the baseline
    Match,
    /// Differs from the baseline; a test failure
    Mismatch(SnapshotDiff),
    /// Differed, and the baseline was overwritten (`UpdateMode::Always`)
    Updated(SnapshotDiff),
}

impl MatchResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, MatchResult::Mismatch(_))
    }

    pub fn diff(&self) -> Option<&SnapshotDiff> {
        match self {
            MatchResult::Mismatch(diff) | MatchResult::Updated(diff) => Some(diff),
            _ => None,
        }
    }
}

/// File name stem for a test id
pub fn file_stem(test_id: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(test_id, "_").into_owned()
}

/// Full record text for `tree` under `test_id`
pub fn record(test_id: &str, tree: &RenderedTree) -> String {
    format!("{HEADER}\n{TEST_PREFIX}{test_id}\n{}", tree.to_canonical())
}

/// Directory of baseline records
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    mode: UpdateMode,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, mode: UpdateMode) -> Self {
        Self {
            dir: dir.into(),
            mode,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.snapshot_dir.clone(), config.update_mode)
    }

    /// Store rooted at `<manifest_dir>/tests/snapshots`, honoring env overrides
    pub fn for_manifest_dir(manifest_dir: &str) -> Self {
        Self::from_config(&HarnessConfig::for_manifest_dir(manifest_dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn baseline_path(&self, test_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", file_stem(test_id)))
    }

    pub fn pending_path(&self, test_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{PENDING_EXTENSION}", file_stem(test_id)))
    }

    /// Stored baseline for `test_id`, if any. CRLF line endings are read as LF.
    pub fn read_baseline(&self, test_id: &str) -> Result<Option<String>> {
        let path = self.baseline_path(test_id);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let text = normalize_line_endings(text);
                if !text.starts_with(HEADER) {
                    return Err(HarnessError::CorruptBaseline {
                        path,
                        reason: format!("missing `{HEADER}` header"),
                    });
                }
                Ok(Some(text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Compare `tree` against the baseline for `test_id`
    pub fn compare(&self, test_id: &str, tree: &RenderedTree) -> Result<MatchResult> {
        let actual = record(test_id, tree);
        let Some(expected) = self.read_baseline(test_id)? else {
            if self.mode == UpdateMode::No {
                return Err(HarnessError::MissingBaseline(test_id.to_string()));
            }
            self.write(&self.baseline_path(test_id), &actual)?;
            info!(test_id, "baseline created");
            return Ok(MatchResult::Created);
        };

        if expected == actual {
            self.remove_if_present(&self.pending_path(test_id))?;
            debug!(test_id, "baseline matched");
            return Ok(MatchResult::Match);
        }

        let diff = SnapshotDiff::between(&expected, &actual);
        match self.mode {
            UpdateMode::Always => {
                self.write(&self.baseline_path(test_id), &actual)?;
                self.remove_if_present(&self.pending_path(test_id))?;
                info!(test_id, "baseline updated");
                Ok(MatchResult::Updated(diff))
            }
            UpdateMode::New => {
                self.write(&self.pending_path(test_id), &actual)?;
                debug!(test_id, "mismatch; pending record written");
                Ok(MatchResult::Mismatch(diff))
            }
            UpdateMode::No => Ok(MatchResult::Mismatch(diff)),
        }
    }

    /// Pending records awaiting review, sorted by path
    pub fn pending(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let suffix = format!(".{PENDING_EXTENSION}");
        let mut pending = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_pending = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix));
            if is_pending {
                pending.push(path);
            }
        }
        pending.sort();
        Ok(pending)
    }

    /// Promote a pending record to baseline. Returns the baseline path.
    pub fn accept(&self, pending: &Path) -> Result<PathBuf> {
        let baseline = baseline_for(pending);
        fs::rename(pending, &baseline)?;
        info!(baseline = %baseline.display(), "pending record accepted");
        Ok(baseline)
    }

    /// Delete a pending record
    pub fn reject(&self, pending: &Path) -> Result<()> {
        fs::remove_file(pending)?;
        info!(pending = %pending.display(), "pending record rejected");
        Ok(())
    }

    /// Diff of a pending record against the baseline it would replace.
    /// A missing baseline diffs as empty; any other read error is returned.
    pub fn pending_diff(&self, pending: &Path) -> Result<SnapshotDiff> {
        let actual = fs::read_to_string(pending)?;
        let expected = match fs::read_to_string(baseline_for(pending)) {
            Ok(text) => normalize_line_endings(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(SnapshotDiff::between(&expected, &actual))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn remove_if_present(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn normalize_line_endings(text: String) -> String {
    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text
    }
}

/// `foo.snap.new` -> `foo.snap`
fn baseline_for(pending: &Path) -> PathBuf {
    let name = pending
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(&format!(".{PENDING_EXTENSION}"))
        .unwrap_or(name);
    pending.with_file_name(format!("{stem}.{EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::TargetId;
    use crate::tree::Node;
    use tempfile::TempDir;

    fn tree(class: &str) -> RenderedTree {
        RenderedTree::new(
            Node::element("div").prop("className", class),
            TargetId::new_for_test(3),
            1,
        )
    }

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("Button component / matches"), "Button_component_matches");
        assert_eq!(file_stem("users.list-1"), "users.list-1");
    }

    #[test]
    fn test_created_then_match() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);

        assert_eq!(store.compare("btn", &tree("btn-group")).unwrap(), MatchResult::Created);
        assert!(store.baseline_path("btn").exists());
        assert_eq!(store.compare("btn", &tree("btn-group")).unwrap(), MatchResult::Match);
    }

    #[test]
    fn test_mismatch_names_changed_property_and_parks_pending() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        store.compare("btn", &tree("btn-group")).unwrap();

        let result = store.compare("btn", &tree("btn-toolbar")).unwrap();
        let MatchResult::Mismatch(diff) = &result else {
            panic!("expected mismatch, got {result:?}");
        };
        let changes: Vec<_> = diff.changes().collect();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|l| l.text().contains("className")));
        assert!(result.is_failure());

        // Baseline untouched, pending record written.
        assert_eq!(store.compare("btn", &tree("btn-group")).unwrap(), MatchResult::Match);
        assert!(!store.pending_path("btn").exists());
    }

    #[test]
    fn test_always_mode_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::Always);
        store.compare("btn", &tree("a")).unwrap();
        assert!(matches!(
            store.compare("btn", &tree("b")).unwrap(),
            MatchResult::Updated(_)
        ));
        assert_eq!(store.compare("btn", &tree("b")).unwrap(), MatchResult::Match);
    }

    #[test]
    fn test_no_mode_refuses_to_create() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::No);
        assert!(matches!(
            store.compare("btn", &tree("a")),
            Err(HarnessError::MissingBaseline(id)) if id == "btn"
        ));
        assert!(!store.baseline_path("btn").exists());
    }

    #[test]
    fn test_accept_and_reject_pending() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        store.compare("one", &tree("a")).unwrap();
        store.compare("two", &tree("a")).unwrap();
        store.compare("one", &tree("b")).unwrap();
        store.compare("two", &tree("b")).unwrap();

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 2);

        let baseline = store.accept(&pending[0]).unwrap();
        assert_eq!(baseline, store.baseline_path("one"));
        store.reject(&pending[1]).unwrap();

        assert!(store.pending().unwrap().is_empty());
        assert_eq!(store.compare("one", &tree("b")).unwrap(), MatchResult::Match);
        assert!(store.compare("two", &tree("b")).unwrap().is_failure());
    }

    #[test]
    fn test_corrupt_baseline_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        fs::write(store.baseline_path("btn"), "not a record").unwrap();
        assert!(matches!(
            store.compare("btn", &tree("a")),
            Err(HarnessError::CorruptBaseline { .. })
        ));
    }

    #[test]
    fn test_crlf_baseline_matches() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        let crlf = record("btn", &tree("a")).replace('\n', "\r\n");
        fs::write(store.baseline_path("btn"), crlf).unwrap();

        assert_eq!(store.compare("btn", &tree("a")).unwrap(), MatchResult::Match);
        assert!(!store.pending_path("btn").exists());
    }

    #[test]
    fn test_pending_diff_without_baseline_is_all_added() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        let pending = store.pending_path("btn");
        fs::write(&pending, record("btn", &tree("a"))).unwrap();

        let diff = store.pending_diff(&pending).unwrap();
        assert!(!diff.is_empty());
        assert!(diff.lines().iter().all(|l| matches!(l, DiffLine::Added(_))));
    }

    #[test]
    fn test_pending_diff_propagates_unreadable_baseline() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path(), UpdateMode::New);
        let pending = store.pending_path("btn");
        fs::write(&pending, record("btn", &tree("a"))).unwrap();
        fs::create_dir(store.baseline_path("btn")).unwrap();

        assert!(matches!(store.pending_diff(&pending), Err(HarnessError::Io(_))));
    }
}
