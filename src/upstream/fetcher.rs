//! Materializing upstream releases in scratch storage.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::ZipArchive;

use super::{ArtifactSource, FetchError, SourceError};
use crate::core::{PluginId, Version};

/// An upstream release unpacked on disk.
#[derive(Debug, Clone)]
pub struct FetchedArtifact {
    /// Directory holding the release's files.
    pub root: PathBuf,
    /// SHA-256 of the downloaded archive (lowercase hex).
    pub sha256: String,
    /// Archive size in bytes.
    pub archive_size: u64,
    /// Number of archive entries unpacked.
    pub entries: usize,
}

/// Downloads and unpacks release archives.
///
/// The fetcher never retries; callers decide what to do with a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactFetcher {
    flush_cache: bool,
}

impl ArtifactFetcher {
    /// Create a fetcher. With `flush_cache`, the source's cache is
    /// invalidated before every download.
    pub fn new(flush_cache: bool) -> Self {
        Self { flush_cache }
    }

    /// Fetch `plugin` at `version` and unpack it below `destination`.
    ///
    /// The archive itself is removed once unpacked. Release archives that
    /// wrap everything in a single top-level directory have that directory
    /// returned as the root.
    pub fn fetch<S: ArtifactSource + ?Sized>(
        &self,
        source: &S,
        plugin: &PluginId,
        version: &Version,
        destination: &Path,
    ) -> Result<FetchedArtifact, FetchError> {
        let reference = format!("{plugin}.{version}");

        fs::create_dir_all(destination).map_err(|e| FetchError::extraction(&reference, e))?;

        if self.flush_cache {
            if let Err(e) = source.invalidate_cache() {
                tracing::warn!(plugin = %plugin, error = %e, "Failed to invalidate upstream cache");
            }
        }

        let bytes = source.download(plugin, version).map_err(|e| match e {
            SourceError::NotFound(_) => FetchError::NotFound(reference.clone()),
            SourceError::Network(message) => {
                FetchError::NetworkFailure { reference: reference.clone(), message }
            }
        })?;

        let sha256 = archive_digest(&bytes);
        let archive_size = bytes.len() as u64;

        let archive_path = destination.join(format!("{reference}.zip"));
        fs::write(&archive_path, &bytes).map_err(|e| FetchError::extraction(&reference, e))?;
        drop(bytes);

        let unpacked = unpack_zip(&archive_path, destination);

        if let Err(e) = fs::remove_file(&archive_path) {
            tracing::warn!(path = %archive_path.display(), error = %e, "Failed to remove archive");
        }

        let entries = unpacked.map_err(|e| FetchError::extraction(&reference, e))?;
        if entries == 0 {
            return Err(FetchError::extraction(&reference, "archive is empty"));
        }

        let root = release_root(destination).map_err(|e| FetchError::extraction(&reference, e))?;

        tracing::debug!(
            plugin = %plugin,
            version = %version,
            sha256 = %sha256,
            entries,
            root = %root.display(),
            "Unpacked upstream release"
        );

        Ok(FetchedArtifact { root, sha256, archive_size, entries })
    }
}

/// Unpack a zip archive into `dest_dir`, returning the number of entries.
fn unpack_zip(archive_path: &Path, dest_dir: &Path) -> io::Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(io::Error::other)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(io::Error::other)?;
        let raw = entry.name().replace('\\', "/");
        let rel = sanitize_archive_path(Path::new(&raw))?;
        let out = dest_dir.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out_file = File::create(&out)?;
        io::copy(&mut entry, &mut out_file)?;
    }

    Ok(archive.len())
}

/// Reject entries that would land outside the destination.
fn sanitize_archive_path(path: &Path) -> io::Result<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unsafe path in archive: {}", path.display()),
                ));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "empty path in archive"));
    }
    Ok(clean)
}

/// The single top-level directory if there is exactly one, else `dir`.
fn release_root(dir: &Path) -> io::Result<PathBuf> {
    let mut children = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    if children.len() == 1 && children[0].file_type()?.is_dir() {
        return Ok(children.remove(0).path());
    }
    Ok(dir.to_path_buf())
}

/// SHA-256 of an archive as lowercase hex.
pub fn archive_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
