//! # Safeupdate
//!
//! Verify WordPress plugins against their upstream releases before updating.
//!
//! For every plugin, safeupdate downloads the published release of the
//! version that is installed and compares it byte for byte with the files on
//! disk. Only a plugin that matches upstream exactly is handed to the
//! platform's own update operation. Anything else is reported with a unified
//! diff and left untouched.
//!
//! ## Quick Start
//!
//! ```bash
//! # Check every installed plugin without changing anything
//! safeupdate --all --dry-run --path /var/www/html
//!
//! # Verify and update two plugins
//! safeupdate akismet hello-dolly --path /var/www/html
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::ref_option)]
#![allow(clippy::cast_possible_truncation)]

pub mod compare;
pub mod core;
pub mod engine;
pub mod registry;
pub mod upstream;

// Re-export commonly used types
pub use compare::{compare, ComparisonReport};
pub use core::{Config, PluginId, ProcessOutcome, RunLogger, RunState, RunSummary, Version};
pub use engine::{Engine, EngineError, EngineOptions};
pub use registry::{PluginRegistry, WpCliRegistry};
pub use upstream::{ArtifactSource, HttpArtifactSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "safeupdate";
