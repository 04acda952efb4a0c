//! Catalog record types as the engine sees them.
//!
//! These mirror what the catalog store returns: a track with its ten
//! acoustic attributes (any of which may be missing for user-submitted
//! tracks), albums, and playlists.

use serde::{Deserialize, Serialize};

/// Account id the catalog uses for system-seeded (reference) records
pub const SYSTEM_OWNER: i64 = 0;

/// Who a catalog record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "owner", rename_all = "snake_case")]
pub enum Origin {
    /// Bulk-imported reference data
    Reference,
    /// Submitted by the account with this id
    User(i64),
}

impl Origin {
    /// Map a stored `owner_id` column to an origin
    #[must_use]
    pub const fn from_owner_id(owner_id: i64) -> Self {
        match owner_id {
            SYSTEM_OWNER => Self::Reference,
            id => Self::User(id),
        }
    }

    #[must_use]
    pub const fn owner_id(self) -> i64 {
        match self {
            Self::Reference => SYSTEM_OWNER,
            Self::User(id) => id,
        }
    }

    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Reference)
    }
}

/// Raw acoustic attributes of a track. `mode` and `key` are small integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub danceability: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub loudness: Option<f64>,
    pub mode: Option<i64>,
    pub key: Option<i64>,
}

/// A song in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub album: String,
    pub album_id: String,
    pub artists: String,
    pub year: Option<i64>,
    #[serde(flatten)]
    pub features: AudioFeatures,
    pub origin: Origin,
}

impl Track {
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.origin.is_reference()
    }
}

/// An album record. Tracks are looked up separately by `album_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub number_of_tracks: i64,
    pub year: Option<i64>,
    /// Per-album aggregate, informational only
    #[serde(flatten)]
    pub features: AudioFeatures,
    pub origin: Origin,
}

/// A user playlist with its tracks in playlist order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub tracks: Vec<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_from_owner_id() {
        assert_eq!(Origin::from_owner_id(0), Origin::Reference);
        assert_eq!(Origin::from_owner_id(7), Origin::User(7));
        assert_eq!(Origin::User(7).owner_id(), 7);
        assert!(Origin::Reference.is_reference());
        assert!(!Origin::User(1).is_reference());
    }

    #[test]
    fn test_track_serializes_flat_features() {
        let track = Track {
            id: "t1".to_string(),
            name: "Song".to_string(),
            album: "Album".to_string(),
            album_id: "a1".to_string(),
            artists: "['Someone']".to_string(),
            year: Some(1999),
            features: AudioFeatures {
                tempo: Some(120.0),
                key: Some(5),
                ..AudioFeatures::default()
            },
            origin: Origin::Reference,
        };

        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["tempo"], 120.0);
        assert_eq!(json["key"], 5);
        assert_eq!(json["origin"]["kind"], "reference");
    }
}
