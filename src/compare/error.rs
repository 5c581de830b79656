//! Tree comparison error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a comparison from producing a report.
///
/// These are distinct from differences: a failed comparison says nothing
/// about whether the trees match.
#[derive(Debug, Error)]
pub enum CompareError {
    /// One of the trees to compare does not exist.
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A file or directory inside a tree could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompareError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
