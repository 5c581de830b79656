//! Per-plugin verification and update decisions.

use std::fs;
use std::path::Path;

use super::{EngineError, EngineOptions};
use crate::compare::{compare, CompareError, ComparisonReport};
use crate::core::{
    AbortKind, CounterDelta, OutcomeKind, PluginId, ProcessOutcome, RunLogger, RunState,
    RunSummary, Version,
};
use crate::registry::PluginRegistry;
use crate::upstream::{
    probe, ArtifactFetcher, ArtifactSource, FetchError, FetchErrorKind, FetchedArtifact,
};

/// Decides, plugin by plugin, whether an update is safe and applies it.
///
/// A plugin is updated only when its installed files are byte-identical to
/// the upstream release of the installed version and the registry reports a
/// newer release. Any difference leaves the plugin untouched.
pub struct Engine<R, S> {
    registry: R,
    source: S,
    options: EngineOptions,
    fetcher: ArtifactFetcher,
    state: RunState,
    logger: RunLogger,
}

impl<R: PluginRegistry, S: ArtifactSource> Engine<R, S> {
    /// Create an engine over the given collaborators.
    pub fn new(registry: R, source: S, options: EngineOptions, logger: RunLogger) -> Self {
        let fetcher = ArtifactFetcher::new(options.flush_cache);
        Self { registry, source, options, fetcher, state: RunState::default(), logger }
    }

    /// Counters so far.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Counters so far, as a printable summary.
    pub fn summary(&self) -> RunSummary {
        RunSummary { state: self.state, dry_run: self.options.dry_run }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    /// Process every installed plugin, in registry order.
    pub fn process_all(&mut self) -> Result<Vec<ProcessOutcome>, EngineError> {
        let plugins = self.registry.list_installed()?;
        tracing::debug!(count = plugins.len(), "Processing all installed plugins");
        Ok(self.process_many(&plugins))
    }

    /// Process the given plugins in order.
    pub fn process_many(&mut self, plugins: &[PluginId]) -> Vec<ProcessOutcome> {
        plugins.iter().map(|plugin| self.process_plugin(plugin)).collect()
    }

    /// Take one plugin to a terminal state and fold it into the counters.
    pub fn process_plugin(&mut self, plugin: &PluginId) -> ProcessOutcome {
        let outcome = self.run(plugin);

        match outcome.kind {
            OutcomeKind::UpdateApplied
            | OutcomeKind::SkippedUpToDate { would_update: false } => {
                self.logger.info(&outcome.message);
            }
            OutcomeKind::SkippedUpToDate { would_update: true } => {
                self.logger.dry_run(&outcome.message);
            }
            OutcomeKind::SkippedModified => self.logger.warning(&outcome.message),
            OutcomeKind::Aborted(_) => self.logger.error(&outcome.message),
        }

        self.state.record(&outcome);
        outcome
    }

    /// Log the run summary and return it.
    pub fn conclude(&mut self) -> RunSummary {
        let summary = self.summary();
        let state = summary.state;
        self.logger.info(format!(
            "Run finished: {} updated, {} modified locally, {} up to date, {} premium, {} failed",
            state.updated, state.differing, state.up_to_date, state.premium, state.aborted
        ));
        summary
    }

    fn run(&mut self, plugin: &PluginId) -> ProcessOutcome {
        // Start -> VersionResolved
        let version = match self.registry.current_version(plugin) {
            Ok(Some(version)) => version,
            Ok(None) => {
                let message = format!("Plugin '{plugin}' is not installed");
                return aborted(plugin, None, AbortKind::NotInstalled, false, message);
            }
            Err(e) => {
                let message = format!("Could not resolve the installed version of '{plugin}': {e}");
                return aborted(plugin, None, AbortKind::RegistryFailed, false, message);
            }
        };
        tracing::debug!(plugin = %plugin, version = %version, "Resolved installed version");

        let premium = !probe(&self.source, plugin, &version).is_published();
        if premium {
            self.logger.info(format!(
                "'{plugin}' {version} is not published in the public registry (premium or private)"
            ));
        }

        let local_dir = match self.registry.plugin_dir(plugin) {
            Ok(dir) => dir,
            Err(e) => {
                let message = format!("Could not locate the files of '{plugin}': {e}");
                return aborted(plugin, Some(version), AbortKind::RegistryFailed, premium, message);
            }
        };

        // VersionResolved -> ArtifactFetched -> Compared
        let scratch = self.options.scratch_dir.join(plugin.as_str());
        let compared = self.fetch_and_compare(plugin, &version, &local_dir, &scratch);
        remove_scratch(&scratch);

        let report = match compared {
            Ok(report) => report,
            Err(Failure::Fetch(e)) => {
                let message = format!("Failed to fetch upstream '{plugin}' {version}: {e}");
                let reason = AbortKind::FetchFailed(e.kind());
                return aborted(plugin, Some(version), reason, premium, message);
            }
            Err(Failure::Compare(e)) => {
                let message = format!("Failed to compare '{plugin}' {version}: {e}");
                return aborted(plugin, Some(version), AbortKind::CompareFailed, premium, message);
            }
        };

        // Any difference is a hard stop; the registry is not consulted.
        if !report.is_identical() {
            self.logger.report(plugin, &version, &report);
            let message = format!(
                "'{plugin}' {version} differs from upstream ({} difference(s)), leaving it untouched",
                report.difference_count()
            );
            return finished(plugin, version, OutcomeKind::SkippedModified, premium, report, message);
        }

        let update_available = match self.registry.update_available(plugin) {
            Ok(available) => available,
            Err(e) => {
                let message = format!("Could not check for updates of '{plugin}': {e}");
                let mut outcome =
                    aborted(plugin, Some(version), AbortKind::RegistryFailed, premium, message);
                outcome.report = Some(report);
                return outcome;
            }
        };

        if !update_available {
            let message = format!("'{plugin}' {version} matches upstream, no update available");
            let kind = OutcomeKind::SkippedUpToDate { would_update: false };
            return finished(plugin, version, kind, premium, report, message);
        }

        if self.options.dry_run {
            let message = format!("'{plugin}' {version} matches upstream, would update");
            let kind = OutcomeKind::SkippedUpToDate { would_update: true };
            return finished(plugin, version, kind, premium, report, message);
        }

        match self.registry.apply_update(plugin, &version) {
            Ok(()) => {
                let message = format!("Updated '{plugin}' (verified at {version})");
                finished(plugin, version, OutcomeKind::UpdateApplied, premium, report, message)
            }
            Err(e) => {
                let message = format!("Update of '{plugin}' failed: {e}");
                let mut outcome =
                    aborted(plugin, Some(version), AbortKind::UpdateApplyFailed, premium, message);
                outcome.report = Some(report);
                outcome
            }
        }
    }

    fn fetch_and_compare(
        &mut self,
        plugin: &PluginId,
        version: &Version,
        local_dir: &Path,
        scratch: &Path,
    ) -> Result<ComparisonReport, Failure> {
        let fetched = self.fetch_with_retries(plugin, version, scratch).map_err(Failure::Fetch)?;
        self.logger.info(format!(
            "Fetched {plugin} {version} ({} bytes, sha256 {})",
            fetched.archive_size, fetched.sha256
        ));

        compare(local_dir, &fetched.root).map_err(Failure::Compare)
    }

    fn fetch_with_retries(
        &self,
        plugin: &PluginId,
        version: &Version,
        scratch: &Path,
    ) -> Result<FetchedArtifact, FetchError> {
        let mut attempt = 0;
        loop {
            remove_scratch(scratch);
            match self.fetcher.fetch(&self.source, plugin, version, scratch) {
                Err(e) if e.kind() == FetchErrorKind::NetworkFailure
                    && attempt < self.options.fetch_retries =>
                {
                    attempt += 1;
                    tracing::warn!(plugin = %plugin, attempt, error = %e, "Retrying download");
                }
                result => return result,
            }
        }
    }
}

enum Failure {
    Fetch(FetchError),
    Compare(CompareError),
}

fn remove_scratch(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(dir) {
        tracing::warn!(path = %dir.display(), error = %e, "Failed to clean scratch directory");
    }
}

fn finished(
    plugin: &PluginId,
    version: Version,
    kind: OutcomeKind,
    premium: bool,
    report: ComparisonReport,
    message: String,
) -> ProcessOutcome {
    ProcessOutcome {
        plugin: plugin.clone(),
        version: Some(version),
        kind,
        delta: CounterDelta::for_outcome(kind, premium),
        report: Some(report),
        message,
    }
}

fn aborted(
    plugin: &PluginId,
    version: Option<Version>,
    reason: AbortKind,
    premium: bool,
    message: String,
) -> ProcessOutcome {
    let kind = OutcomeKind::Aborted(reason);
    ProcessOutcome {
        plugin: plugin.clone(),
        version,
        kind,
        delta: CounterDelta::for_outcome(kind, premium),
        report: None,
        message,
    }
}
