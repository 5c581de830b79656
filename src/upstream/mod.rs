//! Upstream releases.
//!
//! Everything needed to obtain the published copy of a plugin version:
//!
//! - [`ArtifactSource`]: where archives come from (HTTP registry or memory)
//! - [`probe`]: whether a version is publicly listed
//! - [`ArtifactFetcher`]: download, unpack into scratch storage, drop the archive

mod error;
mod fetcher;
mod memory;
mod probe;
mod source;

pub use error::{FetchError, FetchErrorKind, SourceError};
pub use fetcher::{archive_digest, ArtifactFetcher, FetchedArtifact};
pub use memory::{build_release_archive, MemoryArtifactSource};
pub use probe::{probe, Publication};
pub use source::{ArtifactSource, HttpArtifactSource};
