//! Registry backed by wp-cli.
//!
//! Every query shells out to `wp plugin ...` against the installation root.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::{PluginRegistry, RegistryError};
use crate::core::{PluginId, Version};

/// Statuses wp-cli lists that `wp plugin update` cannot act on.
const UNMANAGED_STATUSES: &[&str] = &["must-use", "dropin"];

/// One row of `wp plugin list --format=json`.
#[derive(Debug, Clone, Deserialize)]
struct PluginRow {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    update: String,
    #[serde(default)]
    version: String,
}

/// Whether `path` looks like the root of a WordPress installation.
pub fn is_wordpress_installation(path: &Path) -> bool {
    path.join("wp-config.php").is_file() || path.join("wp-includes").join("version.php").is_file()
}

/// Plugin registry driving wp-cli.
#[derive(Debug, Clone)]
pub struct WpCliRegistry {
    /// Executable (e.g. `wp`)
    program: String,

    /// Arguments placed before every subcommand (e.g. the phar for `php wp-cli.phar`)
    leading_args: Vec<String>,

    /// Installation root
    path: PathBuf,
}

impl WpCliRegistry {
    /// Create a registry for the installation at `path`.
    ///
    /// `command` is split on whitespace, so `php /opt/wp-cli.phar` works.
    pub fn new(command: &str, path: impl Into<PathBuf>) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "wp".to_string());
        Self { program, leading_args: parts.collect(), path: path.into() }
    }

    /// Installation root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a wp-cli subcommand and return its stdout.
    fn wp(&self, args: &[&str]) -> Result<String, RegistryError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .arg(format!("--path={}", self.path.display()))
            .args(["--skip-plugins", "--skip-themes"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.program, args = ?args, "Running wp-cli");

        let output = cmd
            .output()
            .map_err(|source| RegistryError::Spawn { program: self.program.clone(), source })?;

        if !output.status.success() {
            return Err(RegistryError::CommandFailed {
                command: format!("wp {}", args.join(" ")),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list_rows(&self) -> Result<Vec<PluginRow>, RegistryError> {
        let stdout = self.wp(&["plugin", "list", "--format=json", "--fields=name,status,update,version"])?;
        serde_json::from_str(stdout.trim()).map_err(|e| RegistryError::InvalidOutput(e.to_string()))
    }

    fn row(&self, plugin: &PluginId) -> Result<Option<PluginRow>, RegistryError> {
        Ok(self.list_rows()?.into_iter().find(|row| row.name == plugin.as_str()))
    }
}

impl PluginRegistry for WpCliRegistry {
    fn list_installed(&self) -> Result<Vec<PluginId>, RegistryError> {
        Ok(self
            .list_rows()?
            .into_iter()
            .filter(|row| !UNMANAGED_STATUSES.contains(&row.status.as_str()))
            .map(|row| PluginId::new(row.name))
            .collect())
    }

    fn current_version(&self, plugin: &PluginId) -> Result<Option<Version>, RegistryError> {
        Ok(self.row(plugin)?.map(|row| Version::new(row.version)))
    }

    fn plugin_dir(&self, plugin: &PluginId) -> Result<PathBuf, RegistryError> {
        let stdout = self.wp(&["plugin", "path", plugin.as_str(), "--dir"])?;
        let dir = stdout.trim();
        if dir.is_empty() {
            return Err(RegistryError::InvalidOutput(format!("empty path for '{plugin}'")));
        }

        // For a single-file plugin wp-cli answers with the plugins directory itself.
        let dir = PathBuf::from(dir);
        if dir.file_name() != Some(OsStr::new(plugin.as_str())) {
            return Err(RegistryError::SingleFilePlugin(plugin.clone()));
        }
        Ok(dir)
    }

    fn update_available(&self, plugin: &PluginId) -> Result<bool, RegistryError> {
        let row = self.row(plugin)?.ok_or_else(|| RegistryError::NotInstalled(plugin.clone()))?;
        Ok(row.update == "available")
    }

    fn apply_update(
        &self,
        plugin: &PluginId,
        verified_version: &Version,
    ) -> Result<(), RegistryError> {
        let found = self
            .current_version(plugin)?
            .ok_or_else(|| RegistryError::NotInstalled(plugin.clone()))?;
        if &found != verified_version {
            return Err(RegistryError::VersionMismatch {
                plugin: plugin.clone(),
                expected: verified_version.clone(),
                found,
            });
        }

        self.wp(&["plugin", "update", plugin.as_str()])?;
        Ok(())
    }
}
