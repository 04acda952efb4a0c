//! Acoustic feature vectors.
//!
//! Tracks are compared only through a fixed 10-dimensional projection of
//! their audio attributes, always in the order of [`FEATURE_NAMES`]. Nothing
//! is imputed here: a track with a missing attribute is rejected with
//! [`RecommendError::InvalidFeature`], so callers filter incomplete tracks
//! before extraction.

use crate::error::{RecommendError, Result};
use crate::track::{AudioFeatures, Track};

/// Number of dimensions in a feature vector
pub const FEATURE_COUNT: usize = 10;

/// Dimension order of every feature vector and CSV feature column
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "danceability",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "loudness",
    "mode",
    "key",
];

/// One track projected into feature space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub const fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl TryFrom<&AudioFeatures> for FeatureVector {
    /// Name of the first missing feature
    type Error = &'static str;

    fn try_from(features: &AudioFeatures) -> std::result::Result<Self, Self::Error> {
        // mode and key are integers in the catalog, reals in feature space
        #[allow(clippy::cast_precision_loss)]
        let values = [
            features.danceability,
            features.speechiness,
            features.acousticness,
            features.instrumentalness,
            features.liveness,
            features.valence,
            features.tempo,
            features.loudness,
            features.mode.map(|m| m as f64),
            features.key.map(|k| k as f64),
        ];

        let mut row = [0.0; FEATURE_COUNT];
        for (slot, (value, name)) in row.iter_mut().zip(values.into_iter().zip(FEATURE_NAMES)) {
            *slot = value.ok_or(name)?;
        }
        Ok(Self(row))
    }
}

/// Ordered rows of feature vectors, one per track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    #[must_use]
    pub fn new(rows: Vec<FeatureVector>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&FeatureVector> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<FeatureVector> for FeatureMatrix {
    fn from_iter<I: IntoIterator<Item = FeatureVector>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Project a single track into feature space.
///
/// # Errors
///
/// [`RecommendError::InvalidFeature`] naming the first missing attribute.
pub fn extract(track: &Track) -> Result<FeatureVector> {
    FeatureVector::try_from(&track.features).map_err(|feature| RecommendError::InvalidFeature {
        track_id: track.id.clone(),
        feature,
    })
}

/// Project tracks into a matrix, one row per track in input order.
///
/// # Errors
///
/// Fails on the first track with a missing attribute.
pub fn extract_all(tracks: &[Track]) -> Result<FeatureMatrix> {
    tracks.iter().map(extract).collect()
}
