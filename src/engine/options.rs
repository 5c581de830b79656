//! Engine options.

use std::path::PathBuf;

use crate::core::RunConfig;

/// Knobs the engine honors for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Never call the update action.
    pub dry_run: bool,

    /// Invalidate the upstream cache before each download.
    pub flush_cache: bool,

    /// Extra download attempts after a network failure.
    pub fetch_retries: u32,

    /// Parent of the per-plugin scratch directories.
    pub scratch_dir: PathBuf,
}

impl EngineOptions {
    /// Options with everything off, unpacking below `scratch_dir`.
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self { dry_run: false, flush_cache: false, fetch_retries: 0, scratch_dir: scratch_dir.into() }
    }

    /// Options taken from a run configuration.
    pub fn from_config(config: &RunConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            dry_run: config.dry_run,
            flush_cache: config.flush_cache,
            fetch_retries: config.fetch_retries,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the number of retries on network failure.
    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    /// Set cache invalidation before downloads.
    pub fn with_flush_cache(mut self, flush_cache: bool) -> Self {
        self.flush_cache = flush_cache;
        self
    }
}
