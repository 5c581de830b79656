//! Structural and content comparison of two directory trees.

use std::collections::BTreeSet;
use std::path::Path;

use super::report::{diff_entry, ComparisonReport};
use super::tree::{same_content, DirectoryTree, EntryKind, TreeEntry};
use super::CompareError;

/// Compare an installed plugin directory against an unpacked upstream release.
///
/// Only presence and byte content matter; permissions, timestamps and
/// ownership are ignored. Every path of the union is classified, so a
/// directory present on one side only is listed along with its contents.
pub fn compare(local: &Path, upstream: &Path) -> Result<ComparisonReport, CompareError> {
    let local_tree = DirectoryTree::read(local)?;
    let upstream_tree = DirectoryTree::read(upstream)?;
    compare_trees(&local_tree, &upstream_tree)
}

/// Compare two snapshots already taken.
pub fn compare_trees(
    local: &DirectoryTree,
    upstream: &DirectoryTree,
) -> Result<ComparisonReport, CompareError> {
    let all_paths: BTreeSet<&str> = local.paths().chain(upstream.paths()).collect();

    let mut only_local = Vec::new();
    let mut only_upstream = Vec::new();
    let mut changed_content = Vec::new();
    let mut unified_diff = String::new();

    for path in all_paths {
        match (local.get(path), upstream.get(path)) {
            (Some(_), None) => only_local.push(path.to_string()),
            (None, Some(_)) => only_upstream.push(path.to_string()),
            (Some(local_entry), Some(upstream_entry)) => {
                if entries_match(local_entry, upstream_entry)? {
                    continue;
                }
                unified_diff.push_str(&diff_entry(path, upstream_entry, local_entry)?);
                changed_content.push(path.to_string());
            }
            (None, None) => {}
        }
    }

    if !changed_content.is_empty() || !only_local.is_empty() || !only_upstream.is_empty() {
        tracing::debug!(
            local = %local.root().display(),
            upstream = %upstream.root().display(),
            only_local = only_local.len(),
            only_upstream = only_upstream.len(),
            changed = changed_content.len(),
            "Trees differ"
        );
    }

    Ok(ComparisonReport::new(only_local, only_upstream, changed_content, unified_diff))
}

fn entries_match(local: &TreeEntry, upstream: &TreeEntry) -> Result<bool, CompareError> {
    match (&local.kind, &upstream.kind) {
        (EntryKind::Directory, EntryKind::Directory) => Ok(true),
        (EntryKind::File, EntryKind::File) => same_content(&local.path, &upstream.path),
        (EntryKind::Symlink(a), EntryKind::Symlink(b)) => Ok(a == b),
        _ => Ok(false),
    }
}
