//! Tree comparison.
//!
//! Compares an installed plugin directory with the unpacked upstream release
//! of the same version and classifies every difference:
//!
//! - **only local**: present in the installation, absent upstream
//! - **only upstream**: published upstream, missing locally
//! - **changed content**: present on both sides, bytes differ
//!
//! Comparison is content-based; file metadata never makes two trees differ.

mod comparator;
mod error;
mod report;
mod tree;

pub use comparator::{compare, compare_trees};
pub use error::CompareError;
pub use report::{ComparisonReport, DIFF_CONTEXT_LINES};
pub use tree::{DirectoryTree, EntryKind, TreeEntry};
