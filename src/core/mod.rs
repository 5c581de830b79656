//! Core types shared across the crate.
//!
//! Identifiers, configuration, the run log and run-scoped counters.

mod config;
mod logger;
mod state;
mod types;

pub use config::{Config, RunConfig, UpstreamConfig, WordPressConfig, DEFAULT_REGISTRY_URL};
pub use logger::{rotate_log, LogEvent, LogLevel, RunLogger};
pub use state::{AbortKind, CounterDelta, OutcomeKind, ProcessOutcome, RunState, RunSummary};
pub use types::{PluginId, Version};
