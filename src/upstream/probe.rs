//! Publication checks against the public registry.

use super::ArtifactSource;
use crate::core::{PluginId, Version};

/// Whether a plugin version is listed in the public registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// The registry serves this exact version.
    Published,
    /// Not listed, or the registry could not confirm it. Premium and private
    /// plugins land here.
    NotPublished,
}

impl Publication {
    /// Check if published.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Ask the source whether `plugin` at `version` is published.
///
/// Errors count as `NotPublished`: a plugin that cannot be confirmed as
/// published is treated as premium.
pub fn probe<S: ArtifactSource + ?Sized>(
    source: &S,
    plugin: &PluginId,
    version: &Version,
) -> Publication {
    match source.exists(plugin, version) {
        Ok(true) => Publication::Published,
        Ok(false) => Publication::NotPublished,
        Err(e) => {
            tracing::debug!(plugin = %plugin, version = %version, error = %e, "Existence probe failed");
            Publication::NotPublished
        }
    }
}
