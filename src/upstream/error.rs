//! Upstream error types.

use std::fmt;

use thiserror::Error;

/// Errors reported by an [`ArtifactSource`](super::ArtifactSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The registry has no artifact at this reference.
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// The registry could not be reached or answered with an error.
    #[error("Network error: {0}")]
    Network(String),
}

/// Errors that stop an upstream release from being materialized.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure while retrieving the archive.
    #[error("Network failure while fetching {reference}: {message}")]
    NetworkFailure { reference: String, message: String },

    /// No archive is published for this plugin version.
    #[error("No published archive for {0}")]
    NotFound(String),

    /// The archive was corrupt, incomplete or could not be written out.
    #[error("Failed to unpack {reference}: {message}")]
    ExtractionFailure { reference: String, message: String },
}

impl FetchError {
    /// The failure category, without details.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NetworkFailure { .. } => FetchErrorKind::NetworkFailure,
            Self::NotFound(_) => FetchErrorKind::NotFound,
            Self::ExtractionFailure { .. } => FetchErrorKind::ExtractionFailure,
        }
    }

    pub(crate) fn extraction(reference: &str, message: impl fmt::Display) -> Self {
        Self::ExtractionFailure { reference: reference.to_string(), message: message.to_string() }
    }
}

/// Category of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Transport failure.
    NetworkFailure,
    /// Artifact does not exist.
    NotFound,
    /// Archive could not be unpacked.
    ExtractionFailure,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NetworkFailure => "network failure",
            Self::NotFound => "not found",
            Self::ExtractionFailure => "extraction failure",
        };
        f.write_str(name)
    }
}
