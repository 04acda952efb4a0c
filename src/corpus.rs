//! # Reference Corpus
//!
//! The table of reference tracks every recommendation is ranked against.
//! It is built once per process, from bulk CSV files or from the reference
//! tracks already in the catalog store, and is read-only afterwards.
//!
//! ## Lifecycle
//!
//! - [`ReferenceCorpus::load`] reads the source and drops rows with missing
//!   features (logged), keeping source order with no deduplication.
//! - [`initialize`] publishes the corpus in a process-wide `OnceLock`. It
//!   must complete before recommendation traffic is served; a second call
//!   is rejected.
//! - Rows are projected into feature space on construction;
//!   [`ReferenceCorpus::feature_matrix`] assembles the matrix on first use
//!   and memoizes the result. Concurrent first calls are
//!   safe and the projection happens exactly once.
//!
//! Row positions never change, so a row index is a stable handle back to a
//! track id via [`ReferenceCorpus::track_id`].

use crate::error::StartupError;
use crate::features::{FeatureMatrix, FeatureVector, FEATURE_NAMES};
use crate::store::CatalogStore;
use crate::track::{AudioFeatures, Origin, Track};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Process-wide corpus, set once at startup
static REFERENCE_CORPUS: OnceLock<ReferenceCorpus> = OnceLock::new();

/// Where the reference population comes from
#[derive(Clone, Copy)]
pub enum CorpusSource<'a> {
    /// Bulk CSV files, concatenated in the given order
    Csv(&'a [PathBuf]),
    /// Reference-origin tracks in the catalog store
    Store(&'a dyn CatalogStore),
}

impl fmt::Debug for CorpusSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(paths) => f.debug_tuple("Csv").field(paths).finish(),
            Self::Store(_) => f.write_str("Store"),
        }
    }
}

/// One corpus row: a reference track id and its projected features
#[derive(Debug, Clone, PartialEq)]
struct CorpusRow {
    id: String,
    vector: FeatureVector,
}

/// Reference tracks in stable row order plus their memoized feature matrix
#[derive(Debug)]
pub struct ReferenceCorpus {
    rows: Vec<CorpusRow>,
    matrix: OnceLock<FeatureMatrix>,
    description: String,
}

impl ReferenceCorpus {
    /// Build a corpus from an already-materialized list of tracks.
    ///
    /// Non-reference tracks and tracks with incomplete features are skipped.
    ///
    /// # Errors
    ///
    /// [`StartupError::EmptyCorpus`] if nothing usable remains.
    pub fn from_tracks(
        tracks: impl IntoIterator<Item = Track>,
        description: impl Into<String>,
    ) -> Result<Self, StartupError> {
        let description = description.into();
        let mut skipped_incomplete = 0usize;
        let mut skipped_user = 0usize;

        let rows: Vec<CorpusRow> = tracks
            .into_iter()
            .filter_map(|track| {
                if !track.is_reference() {
                    skipped_user += 1;
                    return None;
                }
                match FeatureVector::try_from(&track.features) {
                    Ok(vector) => Some(CorpusRow { id: track.id, vector }),
                    Err(feature) => {
                        debug!("Reference track {} has no {feature}", track.id);
                        skipped_incomplete += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped_incomplete > 0 {
            warn!("Skipped {skipped_incomplete} reference tracks with missing features from {description}");
        }
        if skipped_user > 0 {
            warn!("Skipped {skipped_user} user-submitted tracks from {description}");
        }
        if rows.is_empty() {
            return Err(StartupError::EmptyCorpus);
        }

        info!("Reference corpus ready: {} tracks from {description}", rows.len());
        Ok(Self {
            rows,
            matrix: OnceLock::new(),
            description,
        })
    }

    /// Read the reference population from `source`.
    ///
    /// # Errors
    ///
    /// Any unreadable or malformed source, or an empty result.
    pub fn load(source: CorpusSource<'_>) -> Result<Self, StartupError> {
        match source {
            CorpusSource::Csv(paths) => {
                info!("Loading reference songs from {} csv file(s)", paths.len());
                let mut tracks = Vec::new();
                for path in paths {
                    tracks.extend(read_reference_csv(path)?);
                }
                let names: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
                Self::from_tracks(tracks, format!("csv [{}]", names.join(", ")))
            }
            CorpusSource::Store(store) => {
                info!("Loading reference songs from catalog store, might take a while");
                let tracks = store.reference_tracks().map_err(StartupError::Store)?;
                Self::from_tracks(tracks, "catalog store")
            }
        }
    }

    /// Number of corpus rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Human readable origin of the rows
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Track id of a corpus row
    #[must_use]
    pub fn track_id(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(|row| row.id.as_str())
    }

    /// Feature matrix of the whole corpus, projected on first call
    pub fn feature_matrix(&self) -> &FeatureMatrix {
        self.matrix.get_or_init(|| {
            debug!("Building feature matrix of {} corpus rows", self.rows.len());
            self.rows.iter().map(|row| row.vector).collect()
        })
    }

    /// Whether the feature matrix has been projected yet
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.matrix.get().is_some()
    }
}

/// Publish `corpus` as the process-wide reference corpus.
///
/// # Errors
///
/// [`StartupError::AlreadyInitialized`] if a corpus was already published.
pub fn initialize(corpus: ReferenceCorpus) -> Result<&'static ReferenceCorpus, StartupError> {
    REFERENCE_CORPUS
        .set(corpus)
        .map_err(|_| StartupError::AlreadyInitialized)?;
    global().ok_or(StartupError::EmptyCorpus)
}

/// Load from `source` and publish in one step
///
/// # Errors
///
/// See [`ReferenceCorpus::load`] and [`initialize`].
pub fn initialize_from(source: CorpusSource<'_>) -> Result<&'static ReferenceCorpus, StartupError> {
    if is_initialized() {
        return Err(StartupError::AlreadyInitialized);
    }
    initialize(ReferenceCorpus::load(source)?)
}

/// Check if the process-wide corpus has been published
pub fn is_initialized() -> bool {
    REFERENCE_CORPUS.get().is_some()
}

/// The process-wide corpus, if published
pub fn global() -> Option<&'static ReferenceCorpus> {
    REFERENCE_CORPUS.get()
}

// =============================================================================
// CSV READING
// =============================================================================

/// One line of a bulk reference file. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvTrackRow {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    album_id: String,
    #[serde(default)]
    artists: String,
    #[serde(default, deserialize_with = "na_int")]
    year: Option<i64>,
    #[serde(deserialize_with = "na_float")]
    danceability: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    speechiness: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    acousticness: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    instrumentalness: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    liveness: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    valence: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    tempo: Option<f64>,
    #[serde(deserialize_with = "na_float")]
    loudness: Option<f64>,
    #[serde(deserialize_with = "na_int")]
    mode: Option<i64>,
    #[serde(deserialize_with = "na_int")]
    key: Option<i64>,
}

impl From<CsvTrackRow> for Track {
    fn from(row: CsvTrackRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            album: row.album,
            album_id: row.album_id,
            artists: row.artists,
            year: row.year,
            features: AudioFeatures {
                danceability: row.danceability,
                speechiness: row.speechiness,
                acousticness: row.acousticness,
                instrumentalness: row.instrumentalness,
                liveness: row.liveness,
                valence: row.valence,
                tempo: row.tempo,
                loudness: row.loudness,
                mode: row.mode,
                key: row.key,
            },
            origin: Origin::Reference,
        }
    }
}

/// Empty fields and the literal `NaN` are missing values
fn is_na(raw: &str) -> bool {
    raw.is_empty() || raw == "NaN"
}

fn na_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if is_na(raw) {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        Ok(_) => Err(serde::de::Error::custom(format!("non-finite number '{raw}'"))),
        Err(e) => Err(serde::de::Error::custom(format!("invalid number '{raw}': {e}"))),
    }
}

/// Integers written as `5.0` are accepted
fn na_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if is_na(raw) {
        return Ok(None);
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Some(value));
    }
    match raw.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(value) if value.fract() == 0.0 && value.is_finite() => Ok(Some(value as i64)),
        _ => Err(serde::de::Error::custom(format!("invalid integer '{raw}'"))),
    }
}

/// Read one bulk reference file into reference tracks, in file order.
///
/// # Errors
///
/// Unreadable file, missing required column, or an unparseable value.
pub fn read_reference_csv(path: &Path) -> Result<Vec<Track>, StartupError> {
    debug!("Reading reference csv {}", path.display());
    let file = File::open(path).map_err(|source| StartupError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| StartupError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    for required in std::iter::once("id").chain(FEATURE_NAMES) {
        if !headers.iter().any(|h| h == required) {
            return Err(StartupError::MalformedRow {
                path: path.to_path_buf(),
                row: 1,
                reason: format!("missing required column '{required}'"),
            });
        }
    }

    let mut tracks = Vec::new();
    for result in reader.deserialize::<CsvTrackRow>() {
        let row = result.map_err(|source| {
            if let csv::ErrorKind::Deserialize { pos, err } = source.kind() {
                return StartupError::MalformedRow {
                    path: path.to_path_buf(),
                    row: pos.as_ref().map_or(0, |p| usize::try_from(p.line()).unwrap_or(usize::MAX)),
                    reason: err.to_string(),
                };
            }
            StartupError::Csv {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracks.push(Track::from(row));
    }

    info!("Read {} reference songs from {}", tracks.len(), path.display());
    Ok(tracks)
}
