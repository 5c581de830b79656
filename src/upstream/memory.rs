//! In-memory artifact source.
//!
//! Serves release archives built on the fly from file lists. Used by the test
//! suites and by anything embedding the engine without network access.

use std::cell::Cell;
use std::collections::HashMap;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{ArtifactSource, SourceError};
use crate::core::{PluginId, Version};

#[derive(Debug, Clone)]
enum Payload {
    /// Files packed below a `<slug>/` directory on download.
    Files(Vec<(String, Vec<u8>)>),
    /// Archive bytes served as-is.
    Raw(Vec<u8>),
    /// Every request fails at the transport level.
    Unreachable,
}

#[derive(Debug, Clone)]
struct Release {
    payload: Payload,
    listed: bool,
}

/// Artifact source backed by a map of releases.
#[derive(Debug, Default)]
pub struct MemoryArtifactSource {
    releases: HashMap<(String, String), Release>,
    downloads: Cell<usize>,
    invalidations: Cell<usize>,
}

impl MemoryArtifactSource {
    /// Create an empty source; every download is `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a release made of the given files.
    pub fn with_release(
        mut self,
        plugin: impl Into<PluginId>,
        version: impl Into<Version>,
        files: &[(&str, &[u8])],
    ) -> Self {
        let files = files.iter().map(|(path, data)| ((*path).to_string(), data.to_vec())).collect();
        self.insert(plugin.into(), version.into(), Payload::Files(files), true);
        self
    }

    /// Serve a release that downloads fine but is not listed publicly.
    pub fn with_unlisted_release(
        mut self,
        plugin: impl Into<PluginId>,
        version: impl Into<Version>,
        files: &[(&str, &[u8])],
    ) -> Self {
        let files = files.iter().map(|(path, data)| ((*path).to_string(), data.to_vec())).collect();
        self.insert(plugin.into(), version.into(), Payload::Files(files), false);
        self
    }

    /// Publish raw archive bytes (e.g. a truncated archive).
    pub fn with_raw_archive(
        mut self,
        plugin: impl Into<PluginId>,
        version: impl Into<Version>,
        bytes: Vec<u8>,
    ) -> Self {
        self.insert(plugin.into(), version.into(), Payload::Raw(bytes), true);
        self
    }

    /// Make every request for this release fail with a network error.
    pub fn with_network_failure(
        mut self,
        plugin: impl Into<PluginId>,
        version: impl Into<Version>,
    ) -> Self {
        self.insert(plugin.into(), version.into(), Payload::Unreachable, true);
        self
    }

    /// Number of `download` calls served so far.
    pub fn download_count(&self) -> usize {
        self.downloads.get()
    }

    /// Number of `invalidate_cache` calls so far.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.get()
    }

    fn insert(&mut self, plugin: PluginId, version: Version, payload: Payload, listed: bool) {
        self.releases.insert(
            (plugin.as_str().to_string(), version.as_str().to_string()),
            Release { payload, listed },
        );
    }

    fn release(&self, plugin: &PluginId, version: &Version) -> Option<&Release> {
        self.releases.get(&(plugin.as_str().to_string(), version.as_str().to_string()))
    }
}

impl ArtifactSource for MemoryArtifactSource {
    fn download(&self, plugin: &PluginId, version: &Version) -> Result<Vec<u8>, SourceError> {
        self.downloads.set(self.downloads.get() + 1);

        let reference = format!("{plugin}.{version}.zip");
        let release = self.release(plugin, version).ok_or(SourceError::NotFound(reference))?;

        match &release.payload {
            Payload::Files(files) => build_release_archive(plugin.as_str(), files)
                .map_err(|e| SourceError::Network(e.to_string())),
            Payload::Raw(bytes) => Ok(bytes.clone()),
            Payload::Unreachable => Err(SourceError::Network("connection refused".to_string())),
        }
    }

    fn exists(&self, plugin: &PluginId, version: &Version) -> Result<bool, SourceError> {
        match self.release(plugin, version) {
            None => Ok(false),
            Some(Release { payload: Payload::Unreachable, .. }) => {
                Err(SourceError::Network("connection refused".to_string()))
            }
            Some(release) => Ok(release.listed),
        }
    }

    fn invalidate_cache(&self) -> Result<(), SourceError> {
        self.invalidations.set(self.invalidations.get() + 1);
        Ok(())
    }
}

/// Pack files below a top-level `<slug>/` directory, the way the public
/// registry ships plugin releases.
pub fn build_release_archive(
    slug: &str,
    files: &[(String, Vec<u8>)],
) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.add_directory(format!("{slug}/"), options)?;
    for (path, data) in files {
        writer.start_file(format!("{slug}/{path}"), options)?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}
