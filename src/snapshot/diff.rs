//! Line-level diff between two snapshot records

use std::fmt;

/// One line of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Present in both
    Same(String),
    /// Only in the baseline
    Removed(String),
    /// Only in the new record
    Added(String),
}

impl DiffLine {
    pub fn text(&self) -> &str {
        match self {
            DiffLine::Same(s) | DiffLine::Removed(s) | DiffLine::Added(s) => s,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, DiffLine::Same(_))
    }
}

/// Structural delta between a baseline and an actual record
///
/// Computed on the longest common subsequence of lines, so an inserted node
/// shows up as added lines rather than as every following line changing.
/// Inputs that differ only in line endings or a final newline get a
/// whole-record `-`/`+` pair, so a non-empty diff always means the inputs
/// differ.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotDiff {
    lines: Vec<DiffLine>,
}

impl SnapshotDiff {
    pub fn between(expected: &str, actual: &str) -> Self {
        let a: Vec<&str> = expected.lines().collect();
        let b: Vec<&str> = actual.lines().collect();
        let (n, m) = (a.len(), b.len());

        // lcs[i][j] = LCS length of a[i..] and b[j..]
        let mut lcs = vec![vec![0usize; m + 1]; n + 1];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                lcs[i][j] = if a[i] == b[j] {
                    lcs[i + 1][j + 1] + 1
                } else {
                    lcs[i + 1][j].max(lcs[i][j + 1])
                };
            }
        }

        let mut lines = Vec::with_capacity(n.max(m));
        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if a[i] == b[j] {
                lines.push(DiffLine::Same(a[i].to_string()));
                i += 1;
                j += 1;
            } else if lcs[i + 1][j] >= lcs[i][j + 1] {
                lines.push(DiffLine::Removed(a[i].to_string()));
                i += 1;
            } else {
                lines.push(DiffLine::Added(b[j].to_string()));
                j += 1;
            }
        }
        lines.extend(a[i..].iter().map(|l| DiffLine::Removed(l.to_string())));
        lines.extend(b[j..].iter().map(|l| DiffLine::Added(l.to_string())));

        let mut diff = Self { lines };
        if diff.is_empty() && expected != actual {
            diff.lines.push(DiffLine::Removed(format!("{expected:?}")));
            diff.lines.push(DiffLine::Added(format!("{actual:?}")));
        }
        diff
    }

    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    /// Removed and added lines only
    pub fn changes(&self) -> impl Iterator<Item = &DiffLine> {
        self.lines.iter().filter(|l| l.is_change())
    }

    pub fn is_empty(&self) -> bool {
        self.changes().next().is_none()
    }
}

/// `-` for baseline-only lines, `+` for actual-only lines, ` ` for context
impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                DiffLine::Same(s) => writeln!(f, " {s}")?,
                DiffLine::Removed(s) => writeln!(f, "-{s}")?,
                DiffLine::Added(s) => writeln!(f, "+{s}")?,
            }
        }
        Ok(())
    }
}
