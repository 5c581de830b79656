//! Installed-plugin registry.
//!
//! The registry is the installation's own view of its plugins: which are
//! installed, at which version, whether the platform offers an update, and
//! the update operation itself.

mod memory;
mod wp_cli;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::{PluginId, Version};

pub use memory::MemoryRegistry;
pub use wp_cli::{is_wordpress_installation, WpCliRegistry};

/// Errors raised by a [`PluginRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry tool could not be started.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The registry tool ran and reported failure.
    #[error("`{command}` failed ({}): {stderr}", exit_label(.status))]
    CommandFailed { command: String, status: Option<i32>, stderr: String },

    /// The registry tool produced output we could not understand.
    #[error("Unexpected registry output: {0}")]
    InvalidOutput(String),

    /// The plugin is not installed.
    #[error("Plugin '{0}' is not installed")]
    NotInstalled(PluginId),

    /// The plugin is a lone file in the plugins directory, with no folder of
    /// its own to compare.
    #[error("Plugin '{0}' is a single file without its own directory and cannot be verified")]
    SingleFilePlugin(PluginId),

    /// The installed version changed between verification and update.
    #[error("Plugin '{plugin}' is at version {found}, expected {expected}")]
    VersionMismatch { plugin: PluginId, expected: Version, found: Version },
}

fn exit_label(status: &Option<i32>) -> String {
    status.map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}"))
}

/// Access to the plugins of one installation.
pub trait PluginRegistry {
    /// All installed plugins, in the registry's order.
    fn list_installed(&self) -> Result<Vec<PluginId>, RegistryError>;

    /// Installed version, or `None` if the plugin is not installed.
    fn current_version(&self, plugin: &PluginId) -> Result<Option<Version>, RegistryError>;

    /// Directory holding the installed plugin's files.
    fn plugin_dir(&self, plugin: &PluginId) -> Result<PathBuf, RegistryError>;

    /// Whether the platform reports a newer release.
    fn update_available(&self, plugin: &PluginId) -> Result<bool, RegistryError>;

    /// Update a plugin that was verified at `verified_version`.
    ///
    /// Implementations must refuse if the installed version is no longer
    /// `verified_version`.
    fn apply_update(&self, plugin: &PluginId, verified_version: &Version)
        -> Result<(), RegistryError>;
}
