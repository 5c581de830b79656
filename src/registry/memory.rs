//! In-memory plugin registry for tests and embedding.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{PluginRegistry, RegistryError};
use crate::core::{PluginId, Version};

#[derive(Debug, Clone)]
struct Installed {
    id: PluginId,
    version: Version,
    dir: PathBuf,
    update_available: bool,
}

/// Registry holding a fixed list of plugins.
///
/// Every `apply_update` call is recorded so tests can assert on it.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    plugins: RefCell<Vec<Installed>>,
    failing_updates: HashSet<PluginId>,
    applied: RefCell<Vec<(PluginId, Version)>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an installed plugin whose files live in `dir`.
    pub fn with_plugin(
        self,
        plugin: impl Into<PluginId>,
        version: impl Into<Version>,
        dir: impl AsRef<Path>,
        update_available: bool,
    ) -> Self {
        self.plugins.borrow_mut().push(Installed {
            id: plugin.into(),
            version: version.into(),
            dir: dir.as_ref().to_path_buf(),
            update_available,
        });
        self
    }

    /// Make `apply_update` fail for this plugin.
    pub fn with_failing_update(mut self, plugin: impl Into<PluginId>) -> Self {
        self.failing_updates.insert(plugin.into());
        self
    }

    /// Every successful or attempted update, in call order.
    pub fn applied_updates(&self) -> Vec<(PluginId, Version)> {
        self.applied.borrow().clone()
    }

    fn find(&self, plugin: &PluginId) -> Option<Installed> {
        self.plugins.borrow().iter().find(|p| &p.id == plugin).cloned()
    }
}

impl PluginRegistry for MemoryRegistry {
    fn list_installed(&self) -> Result<Vec<PluginId>, RegistryError> {
        Ok(self.plugins.borrow().iter().map(|p| p.id.clone()).collect())
    }

    fn current_version(&self, plugin: &PluginId) -> Result<Option<Version>, RegistryError> {
        Ok(self.find(plugin).map(|p| p.version))
    }

    fn plugin_dir(&self, plugin: &PluginId) -> Result<PathBuf, RegistryError> {
        self.find(plugin).map(|p| p.dir).ok_or_else(|| RegistryError::NotInstalled(plugin.clone()))
    }

    fn update_available(&self, plugin: &PluginId) -> Result<bool, RegistryError> {
        self.find(plugin)
            .map(|p| p.update_available)
            .ok_or_else(|| RegistryError::NotInstalled(plugin.clone()))
    }

    fn apply_update(
        &self,
        plugin: &PluginId,
        verified_version: &Version,
    ) -> Result<(), RegistryError> {
        self.applied.borrow_mut().push((plugin.clone(), verified_version.clone()));

        let installed =
            self.find(plugin).ok_or_else(|| RegistryError::NotInstalled(plugin.clone()))?;
        if &installed.version != verified_version {
            return Err(RegistryError::VersionMismatch {
                plugin: plugin.clone(),
                expected: verified_version.clone(),
                found: installed.version,
            });
        }
        if self.failing_updates.contains(plugin) {
            return Err(RegistryError::CommandFailed {
                command: format!("update {plugin}"),
                status: Some(1),
                stderr: "update rejected".to_string(),
            });
        }

        if let Some(entry) = self.plugins.borrow_mut().iter_mut().find(|p| &p.id == plugin) {
            entry.update_available = false;
        }
        Ok(())
    }
}
