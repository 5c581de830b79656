//! Identifier types shared by every stage of a run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Plugin slug as known to the installation (e.g. `akismet`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Create a plugin identifier.
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Get the slug.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

impl From<String> for PluginId {
    fn from(slug: String) -> Self {
        Self(slug)
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Release label exactly as the installation reports it.
///
/// Versions are opaque: they are never parsed or ordered, only copied into
/// download references and log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a version label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Get the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Version {
    fn from(label: String) -> Self {
        Self(label)
    }
}
