//! Run-scoped counters and per-plugin outcomes.

use std::fmt;

use super::{PluginId, Version};
use crate::compare::ComparisonReport;
use crate::upstream::FetchErrorKind;

/// Why a plugin's processing stopped before a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// Not present in the installation.
    NotInstalled,
    /// The registry itself failed to answer.
    RegistryFailed,
    /// The upstream release could not be obtained.
    FetchFailed(FetchErrorKind),
    /// A tree to compare was missing or unreadable.
    CompareFailed,
    /// The update operation was attempted and failed.
    UpdateApplyFailed,
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => f.write_str("not installed"),
            Self::RegistryFailed => f.write_str("registry failure"),
            Self::FetchFailed(kind) => write!(f, "fetch failed ({kind})"),
            Self::CompareFailed => f.write_str("comparison failed"),
            Self::UpdateApplyFailed => f.write_str("update failed"),
        }
    }
}

/// Terminal state reached for one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Verified identical and updated.
    UpdateApplied,
    /// Differs from upstream; left untouched.
    SkippedModified,
    /// Verified identical; nothing to do, or a dry run that would update.
    SkippedUpToDate { would_update: bool },
    /// Stopped before a decision.
    Aborted(AbortKind),
}

impl OutcomeKind {
    /// Whether processing reached a decision.
    pub fn is_completed(&self) -> bool {
        !matches!(self, Self::Aborted(_))
    }
}

/// Counter increments produced by one plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub updated: u32,
    pub differing: u32,
    pub up_to_date: u32,
    pub premium: u32,
}

impl CounterDelta {
    /// Delta for a decision, plus the premium flag.
    pub fn for_outcome(kind: OutcomeKind, premium: bool) -> Self {
        let mut delta = Self { premium: u32::from(premium), ..Self::default() };
        match kind {
            OutcomeKind::UpdateApplied => delta.updated = 1,
            OutcomeKind::SkippedModified => delta.differing = 1,
            OutcomeKind::SkippedUpToDate { .. } => delta.up_to_date = 1,
            OutcomeKind::Aborted(_) => {}
        }
        delta
    }
}

/// Result of processing one plugin.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// The plugin processed.
    pub plugin: PluginId,
    /// Installed version, once resolved.
    pub version: Option<Version>,
    /// Terminal state.
    pub kind: OutcomeKind,
    /// Counter changes this outcome caused.
    pub delta: CounterDelta,
    /// Comparison report, if the comparison ran.
    pub report: Option<ComparisonReport>,
    /// One-line description of the outcome.
    pub message: String,
}

/// Counters for a single run. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub updated: u32,
    pub differing: u32,
    pub up_to_date: u32,
    pub premium: u32,
    pub aborted: u32,
}

impl RunState {
    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        self.updated += outcome.delta.updated;
        self.differing += outcome.delta.differing;
        self.up_to_date += outcome.delta.up_to_date;
        self.premium += outcome.delta.premium;
        if !outcome.kind.is_completed() {
            self.aborted += 1;
        }
    }

    /// Plugins that reached a decision.
    pub fn completed(&self) -> u32 {
        self.updated + self.differing + self.up_to_date
    }
}

/// End-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Final counters.
    pub state: RunState,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.dry_run { "Summary (dry run)" } else { "Summary" };
        writeln!(f, "{title}:")?;
        writeln!(f, "  Updated:          {}", self.state.updated)?;
        writeln!(f, "  Modified locally: {}", self.state.differing)?;
        writeln!(f, "  Up to date:       {}", self.state.up_to_date)?;
        writeln!(f, "  Premium/private:  {}", self.state.premium)?;
        write!(f, "  Failed:           {}", self.state.aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: OutcomeKind, premium: bool) -> ProcessOutcome {
        ProcessOutcome {
            plugin: PluginId::from("demo"),
            version: Some(Version::from("1.0")),
            kind,
            delta: CounterDelta::for_outcome(kind, premium),
            report: None,
            message: String::new(),
        }
    }

    #[test]
    fn test_delta_per_outcome() {
        assert_eq!(CounterDelta::for_outcome(OutcomeKind::UpdateApplied, false).updated, 1);
        assert_eq!(CounterDelta::for_outcome(OutcomeKind::SkippedModified, false).differing, 1);
        assert_eq!(
            CounterDelta::for_outcome(OutcomeKind::SkippedUpToDate { would_update: true }, false)
                .up_to_date,
            1
        );

        let aborted = CounterDelta::for_outcome(
            OutcomeKind::Aborted(AbortKind::FetchFailed(FetchErrorKind::NotFound)),
            true,
        );
        assert_eq!(aborted, CounterDelta { premium: 1, ..CounterDelta::default() });
    }

    #[test]
    fn test_record_sums_completed() {
        let mut state = RunState::default();
        state.record(&outcome(OutcomeKind::UpdateApplied, false));
        state.record(&outcome(OutcomeKind::SkippedModified, true));
        state.record(&outcome(OutcomeKind::SkippedUpToDate { would_update: false }, false));
        state.record(&outcome(OutcomeKind::Aborted(AbortKind::NotInstalled), false));

        assert_eq!(state.completed(), 3);
        assert_eq!(state.premium, 1);
        assert_eq!(state.aborted, 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary { state: RunState::default(), dry_run: true };
        let text = summary.to_string();
        assert!(text.starts_with("Summary (dry run):"));
        assert!(text.contains("Updated:          0"));
        assert!(text.contains("Failed:           0"));
    }

    #[test]
    fn test_abort_kind_display() {
        let kind = AbortKind::FetchFailed(FetchErrorKind::NetworkFailure);
        assert_eq!(kind.to_string(), "fetch failed (network failure)");
    }
}
