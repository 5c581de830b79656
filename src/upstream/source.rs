//! Where upstream release archives come from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::StatusCode;

use super::SourceError;
use crate::core::{PluginId, Version};

/// A store of published plugin archives.
pub trait ArtifactSource {
    /// Retrieve the release archive for a plugin version.
    fn download(&self, plugin: &PluginId, version: &Version) -> Result<Vec<u8>, SourceError>;

    /// Check whether an archive is published, without retrieving it.
    fn exists(&self, plugin: &PluginId, version: &Version) -> Result<bool, SourceError>;

    /// Drop anything cached between this process and the registry.
    fn invalidate_cache(&self) -> Result<(), SourceError>;
}

/// Archives served over HTTP at `{base_url}/{slug}.{version}.zip`.
#[derive(Debug)]
pub struct HttpArtifactSource {
    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client
    client: reqwest::blocking::Client,

    /// Ask intermediaries to revalidate once the cache was invalidated
    bypass_cache: AtomicBool,
}

impl HttpArtifactSource {
    /// Create a source for the given registry base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(format!("safeupdate/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            bypass_cache: AtomicBool::new(false),
        })
    }

    /// Download reference for a plugin version.
    pub fn artifact_url(&self, plugin: &PluginId, version: &Version) -> String {
        format!("{}/{}.{}.zip", self.base_url, plugin, version)
    }

    fn with_cache_headers(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        if self.bypass_cache.load(Ordering::Relaxed) {
            request.header(CACHE_CONTROL, "no-cache").header(PRAGMA, "no-cache")
        } else {
            request
        }
    }
}

impl ArtifactSource for HttpArtifactSource {
    fn download(&self, plugin: &PluginId, version: &Version) -> Result<Vec<u8>, SourceError> {
        let url = self.artifact_url(plugin, version);
        tracing::debug!(url = %url, "Downloading archive");

        let response = self
            .with_cache_headers(self.client.get(&url))
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if !status.is_success() {
            return Err(SourceError::Network(format!("HTTP {status} for {url}")));
        }

        let bytes = response.bytes().map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn exists(&self, plugin: &PluginId, version: &Version) -> Result<bool, SourceError> {
        let url = self.artifact_url(plugin, version);

        let response = self
            .with_cache_headers(self.client.head(&url))
            .send()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    fn invalidate_cache(&self) -> Result<(), SourceError> {
        self.bypass_cache.store(true, Ordering::Relaxed);
        Ok(())
    }
}
