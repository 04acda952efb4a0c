//! # Error Types
//!
//! Typed failures for the recommendation engine. Per-request failures are
//! [`RecommendError`]; anything that goes wrong while building the reference
//! corpus is a [`StartupError`] and stops the process from serving
//! recommendations at all.
//!
//! Catalog store calls and the CLI keep using `anyhow::Result`; store errors
//! are wrapped into [`RecommendError::Store`] when they cross into the engine.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of catalog entity a seed id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Track,
    Album,
    Playlist,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Playlist => "playlist",
        };
        f.write_str(name)
    }
}

/// Why a seed that exists cannot be used for recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    /// Seed was created by an account, not part of the reference catalog
    UserSubmitted,
    /// Album resolves but has no tracks
    EmptyAlbum,
    /// Playlist or starred list has no reference-origin tracks
    NoReferenceTracks,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::UserSubmitted => "user registered items are incompatible for recommendation",
            Self::EmptyAlbum => "album has no tracks",
            Self::NoReferenceTracks => "no reference tracks to recommend from",
        };
        f.write_str(reason)
    }
}

/// Failure of a single recommendation request
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Seed id does not resolve in the catalog store
    #[error("Invalid {entity} id: {id}")]
    NotFound { entity: Entity, id: String },

    /// Seed resolves but cannot be used
    #[error("Ineligible seed: {0}")]
    IneligibleSeed(IneligibleReason),

    /// Corpus too small for the query size plus requested count
    #[error("Could not find the required amount of recommendation(s): need {required} corpus rows, have {available}")]
    InsufficientCorpus { required: usize, available: usize },

    /// A query track is missing one of the acoustic features
    #[error("Track {track_id} has no value for feature '{feature}'")]
    InvalidFeature { track_id: String, feature: &'static str },

    /// Catalog store failure
    #[error("Catalog store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Failure to build the reference corpus. Fatal for the process.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to read reference source {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed reference source {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row {row} in {}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Failed to load reference tracks from catalog store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Reference corpus is empty")]
    EmptyCorpus,

    #[error("Reference corpus already initialized")]
    AlreadyInitialized,
}

/// Convenience Result type for engine operations
pub type Result<T> = std::result::Result<T, RecommendError>;
