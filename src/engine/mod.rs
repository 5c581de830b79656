//! Verification and update decision engine.
//!
//! For each plugin the engine resolves the installed version, fetches the
//! matching upstream release into scratch storage, compares it against the
//! installed files and then updates, skips or aborts:
//!
//! ```text
//! Start -> VersionResolved -> ArtifactFetched -> Compared
//!     -> UpdateApplied | SkippedModified | SkippedUpToDate | Aborted
//! ```
//!
//! Failures are contained at the plugin boundary. A failing plugin is logged
//! and counted, and the run continues with the next one.

mod decision;
mod options;

use thiserror::Error;

use crate::registry::RegistryError;

pub use decision::Engine;
pub use options::EngineOptions;

/// Errors that stop a whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The list of installed plugins could not be obtained.
    #[error("Failed to list installed plugins: {0}")]
    ListInstalled(#[from] RegistryError),
}
