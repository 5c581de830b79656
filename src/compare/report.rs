//! Comparison reports.

use std::fmt::Write as _;

use similar::TextDiff;

use super::tree::{EntryKind, TreeEntry};
use super::CompareError;

/// Lines of context around each change in the unified diff.
pub const DIFF_CONTEXT_LINES: usize = 1;

/// Outcome of comparing a local tree against its upstream release.
///
/// All path lists are sorted lexicographically, so comparing the same inputs
/// twice yields equal reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonReport {
    identical: bool,
    only_local: Vec<String>,
    only_upstream: Vec<String>,
    changed_content: Vec<String>,
    unified_diff: String,
}

impl ComparisonReport {
    pub(crate) fn new(
        only_local: Vec<String>,
        only_upstream: Vec<String>,
        changed_content: Vec<String>,
        unified_diff: String,
    ) -> Self {
        let identical =
            only_local.is_empty() && only_upstream.is_empty() && changed_content.is_empty();
        Self { identical, only_local, only_upstream, changed_content, unified_diff }
    }

    /// Whether the trees match path for path and byte for byte.
    pub fn is_identical(&self) -> bool {
        self.identical
    }

    /// Paths present only in the local installation.
    pub fn only_local(&self) -> &[String] {
        &self.only_local
    }

    /// Paths present only in the upstream release.
    pub fn only_upstream(&self) -> &[String] {
        &self.only_upstream
    }

    /// Paths present on both sides with different content.
    pub fn changed_content(&self) -> &[String] {
        &self.changed_content
    }

    /// Unified diff of every changed file, in path order.
    pub fn unified_diff(&self) -> &str {
        &self.unified_diff
    }

    /// Total number of differing paths.
    pub fn difference_count(&self) -> usize {
        self.only_local.len() + self.only_upstream.len() + self.changed_content.len()
    }

    /// Full textual report: presence differences followed by the diff body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in &self.only_local {
            let _ = writeln!(out, "Only in local: {path}");
        }
        for path in &self.only_upstream {
            let _ = writeln!(out, "Only in upstream: {path}");
        }
        out.push_str(&self.unified_diff);
        out
    }
}

/// Diff text for one path that differs between the trees.
pub(crate) fn diff_entry(
    relative: &str,
    upstream: &TreeEntry,
    local: &TreeEntry,
) -> Result<String, CompareError> {
    let old_label = format!("upstream/{relative}");
    let new_label = format!("local/{relative}");

    match (&upstream.kind, &local.kind) {
        (EntryKind::File, EntryKind::File) => {
            let old = std::fs::read(&upstream.path).map_err(|e| CompareError::io(&upstream.path, e))?;
            let new = std::fs::read(&local.path).map_err(|e| CompareError::io(&local.path, e))?;

            let (Ok(old), Ok(new)) = (std::str::from_utf8(&old), std::str::from_utf8(&new)) else {
                return Ok(format!("Binary files {old_label} and {new_label} differ\n"));
            };

            let diff = TextDiff::from_lines(old, new);
            let text = diff
                .unified_diff()
                .context_radius(DIFF_CONTEXT_LINES)
                .header(&old_label, &new_label)
                .to_string();
            Ok(text)
        }
        (EntryKind::Symlink(old), EntryKind::Symlink(new)) => Ok(format!(
            "Symbolic links {old_label} -> {} and {new_label} -> {} differ\n",
            old.display(),
            new.display()
        )),
        (old, new) => Ok(format!(
            "File {old_label} is {} while file {new_label} is {}\n",
            old.describe(),
            new.describe()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_iff_no_paths() {
        let empty = ComparisonReport::new(vec![], vec![], vec![], String::new());
        assert!(empty.is_identical());
        assert_eq!(empty.difference_count(), 0);

        let local_only =
            ComparisonReport::new(vec!["debug.log".into()], vec![], vec![], String::new());
        assert!(!local_only.is_identical());

        let upstream_only =
            ComparisonReport::new(vec![], vec!["readme.txt".into()], vec![], String::new());
        assert!(!upstream_only.is_identical());
    }

    #[test]
    fn test_render_lists_presence_then_diff() {
        let report = ComparisonReport::new(
            vec!["custom.css".into()],
            vec!["license.txt".into()],
            vec!["plugin.php".into()],
            "--- upstream/plugin.php\n+++ local/plugin.php\n".into(),
        );

        let rendered = report.render();
        assert_eq!(
            rendered,
            "Only in local: custom.css\nOnly in upstream: license.txt\n\
             --- upstream/plugin.php\n+++ local/plugin.php\n"
        );
        assert_eq!(report.difference_count(), 3);
    }
}
