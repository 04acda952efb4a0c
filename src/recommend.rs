//! # Recommendation Orchestrator
//!
//! Turns a seed (a track, an album, a playlist, or a user's starred list)
//! into query tracks, ranks the reference corpus against them, and resolves
//! the winning corpus rows back to full catalog records.
//!
//! ## Flow
//!
//! 1. Resolve the seed through the [`CatalogStore`] and apply its
//!    eligibility rule. Nothing touches the corpus until this passes.
//! 2. Pre-flight bound: the corpus must hold at least
//!    `query tracks + count` rows.
//! 3. Project the query tracks into feature space and score them against
//!    the corpus feature matrix.
//! 4. Greedily select `count` corpus rows from the scores of the **first**
//!    query track. Scores of the remaining query tracks are computed and
//!    then dropped; album, playlist and starred seeds therefore rank by
//!    their first track only.
//! 5. Look each selected row up in the store, in selection order.
//!
//! Every failure happens before a result is returned; there are no partial
//! results.

use crate::corpus::ReferenceCorpus;
use crate::error::{Entity, IneligibleReason, RecommendError, Result};
use crate::features;
use crate::selector::select_top_k;
use crate::similarity::similarity_matrix;
use crate::store::CatalogStore;
use crate::track::Track;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of recommendations when the caller does not ask for a count
pub const DEFAULT_COUNT: usize = 10;

/// What to base recommendations on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "seed_id", rename_all = "snake_case")]
pub enum Seed {
    Track(String),
    Album(String),
    Playlist(i64),
    /// Starred list of the requesting user
    Starred(i64),
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track {id}"),
            Self::Album(id) => write!(f, "album {id}"),
            Self::Playlist(id) => write!(f, "playlist {id}"),
            Self::Starred(user) => write!(f, "starred list of user {user}"),
        }
    }
}

/// A recommendation request: seed plus how many results to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub seed: Seed,
    #[serde(default = "default_count")]
    pub count: usize,
}

const fn default_count() -> usize {
    DEFAULT_COUNT
}

impl RecommendRequest {
    #[must_use]
    pub const fn new(seed: Seed) -> Self {
        Self {
            seed,
            count: DEFAULT_COUNT,
        }
    }

    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// A recommended track and the similarity it was selected with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub track: Track,
    pub score: f64,
}

/// Recommendation engine over one catalog store and one reference corpus
pub struct Recommender<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
    corpus: &'a ReferenceCorpus,
}

impl<'a, S: CatalogStore + ?Sized> Recommender<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, corpus: &'a ReferenceCorpus) -> Self {
        Self { store, corpus }
    }

    /// Serve a request
    ///
    /// # Errors
    ///
    /// Any [`RecommendError`]; see the mode-specific methods.
    pub fn recommend(&self, request: &RecommendRequest) -> Result<Vec<Recommendation>> {
        debug!("Recommending {} tracks for {}", request.count, request.seed);
        let query = self.resolve_seed(&request.seed)?;
        let results = self.rank(&query, request.count)?;
        info!("Recommended {} tracks for {}", results.len(), request.seed);
        Ok(results)
    }

    /// Recommendations similar to one reference track
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `IneligibleSeed` for a user-submitted
    /// track, `InsufficientCorpus` if the corpus has fewer than `1 + count` rows.
    pub fn by_track(&self, track_id: &str, count: usize) -> Result<Vec<Recommendation>> {
        self.recommend(&RecommendRequest::new(Seed::Track(track_id.to_string())).with_count(count))
    }

    /// Recommendations for a reference album
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `IneligibleSeed` for a user-submitted or
    /// empty album, `InsufficientCorpus` if the corpus has fewer than
    /// `tracks + count` rows.
    pub fn by_album(&self, album_id: &str, count: usize) -> Result<Vec<Recommendation>> {
        self.recommend(&RecommendRequest::new(Seed::Album(album_id.to_string())).with_count(count))
    }

    /// Recommendations for the reference tracks of a playlist
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `IneligibleSeed` if it has no reference
    /// tracks, `InsufficientCorpus` as above.
    pub fn by_playlist(&self, playlist_id: i64, count: usize) -> Result<Vec<Recommendation>> {
        self.recommend(&RecommendRequest::new(Seed::Playlist(playlist_id)).with_count(count))
    }

    /// Recommendations for the reference tracks a user has starred
    ///
    /// # Errors
    ///
    /// `IneligibleSeed` if none of the starred tracks are reference tracks,
    /// `InsufficientCorpus` as above.
    pub fn by_starred(&self, user_id: i64, count: usize) -> Result<Vec<Recommendation>> {
        self.recommend(&RecommendRequest::new(Seed::Starred(user_id)).with_count(count))
    }

    /// Seed to eligible query tracks, in seed order
    fn resolve_seed(&self, seed: &Seed) -> Result<Vec<Track>> {
        match seed {
            Seed::Track(id) => {
                let track = self.store.get_track(id)?.ok_or_else(|| RecommendError::NotFound {
                    entity: Entity::Track,
                    id: id.clone(),
                })?;
                if !track.is_reference() {
                    return Err(RecommendError::IneligibleSeed(IneligibleReason::UserSubmitted));
                }
                Ok(vec![track])
            }
            Seed::Album(id) => {
                let album = self.store.get_album(id)?.ok_or_else(|| RecommendError::NotFound {
                    entity: Entity::Album,
                    id: id.clone(),
                })?;
                if !album.origin.is_reference() {
                    return Err(RecommendError::IneligibleSeed(IneligibleReason::UserSubmitted));
                }
                let tracks = self.store.get_album_tracks(id)?;
                if tracks.is_empty() {
                    return Err(RecommendError::IneligibleSeed(IneligibleReason::EmptyAlbum));
                }
                Ok(tracks)
            }
            Seed::Playlist(id) => {
                let playlist = self.store.get_playlist(*id)?.ok_or_else(|| RecommendError::NotFound {
                    entity: Entity::Playlist,
                    id: id.to_string(),
                })?;
                only_reference(playlist.tracks)
            }
            Seed::Starred(user_id) => only_reference(self.store.get_starred(*user_id)?),
        }
    }

    /// Rank the corpus against `query` and resolve the top `count` rows
    fn rank(&self, query: &[Track], count: usize) -> Result<Vec<Recommendation>> {
        let available = self.corpus.len();
        let required = query.len().saturating_add(count);
        if available < required {
            return Err(RecommendError::InsufficientCorpus { required, available });
        }

        let query_matrix = features::extract_all(query)?;
        let similarities = similarity_matrix(&query_matrix, self.corpus.feature_matrix());
        debug!(
            "Scored {}x{} similarity matrix, ranking by first query track",
            similarities.query_len(),
            similarities.corpus_len()
        );

        // Only the first query row drives selection
        let scores = similarities.into_row(0).unwrap_or_default();
        let selections = select_top_k(scores, count)?;

        selections
            .into_iter()
            .map(|selection| -> Result<Recommendation> {
                let id = self.corpus.track_id(selection.index).ok_or_else(|| RecommendError::NotFound {
                    entity: Entity::Track,
                    id: format!("corpus row {}", selection.index),
                })?;
                let track = self.store.get_track(id)?.ok_or_else(|| {
                    warn!("Corpus track {id} is not in the catalog store");
                    RecommendError::NotFound {
                        entity: Entity::Track,
                        id: id.to_string(),
                    }
                })?;
                Ok(Recommendation {
                    track,
                    score: selection.score,
                })
            })
            .collect()
    }
}

fn only_reference(tracks: Vec<Track>) -> Result<Vec<Track>> {
    let reference: Vec<Track> = tracks.into_iter().filter(Track::is_reference).collect();
    if reference.is_empty() {
        return Err(RecommendError::IneligibleSeed(IneligibleReason::NoReferenceTracks));
    }
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::track_with;
    use crate::features::FEATURE_COUNT;
    use crate::track::{Album, AudioFeatures, Origin, Playlist};
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Catalog held in maps, counting track lookups
    #[derive(Default)]
    struct MemoryStore {
        tracks: Vec<Track>,
        albums: HashMap<String, Album>,
        playlists: HashMap<i64, Vec<String>>,
        starred: HashMap<i64, Vec<String>>,
        track_lookups: Cell<usize>,
    }

    impl MemoryStore {
        fn find(&self, id: &str) -> Option<Track> {
            self.tracks.iter().find(|t| t.id == id).cloned()
        }
    }

    impl CatalogStore for MemoryStore {
        fn get_track(&self, id: &str) -> anyhow::Result<Option<Track>> {
            self.track_lookups.set(self.track_lookups.get() + 1);
            Ok(self.find(id))
        }

        fn get_album(&self, id: &str) -> anyhow::Result<Option<Album>> {
            Ok(self.albums.get(id).cloned())
        }

        fn get_album_tracks(&self, album_id: &str) -> anyhow::Result<Vec<Track>> {
            Ok(self.tracks.iter().filter(|t| t.album_id == album_id).cloned().collect())
        }

        fn get_playlist(&self, id: i64) -> anyhow::Result<Option<Playlist>> {
            Ok(self.playlists.get(&id).map(|ids| Playlist {
                id,
                name: format!("playlist {id}"),
                owner_id: 1,
                tracks: ids.iter().filter_map(|s| self.find(s)).collect(),
            }))
        }

        fn get_starred(&self, user_id: i64) -> anyhow::Result<Vec<Track>> {
            Ok(self
                .starred
                .get(&user_id)
                .map(|ids| ids.iter().filter_map(|s| self.find(s)).collect())
                .unwrap_or_default())
        }

        fn reference_tracks(&self) -> anyhow::Result<Vec<Track>> {
            Ok(self.tracks.iter().filter(|t| t.is_reference()).cloned().collect())
        }
    }

    /// Five reference tracks with pairwise distinct directions
    fn five_tracks() -> Vec<Track> {
        vec![
            track_with("a", [0.9, 0.1, 0.1, 0.0, 0.1, 0.8, 120.0, -5.0, 1.0, 5.0]),
            track_with("b", [0.8, 0.1, 0.2, 0.0, 0.1, 0.7, 118.0, -6.0, 1.0, 5.0]),
            track_with("c", [0.2, 0.5, 0.9, 0.8, 0.3, 0.1, 70.0, -20.0, 0.0, 2.0]),
            track_with("d", [0.5, 0.3, 0.5, 0.4, 0.2, 0.5, 100.0, -10.0, 1.0, 9.0]),
            track_with("e", [0.7, 0.2, 0.1, 0.1, 0.6, 0.9, 140.0, -3.0, 0.0, 0.0]),
        ]
    }

    fn setup(tracks: Vec<Track>) -> (MemoryStore, ReferenceCorpus) {
        let corpus = ReferenceCorpus::from_tracks(tracks.clone(), "test").unwrap();
        let store = MemoryStore {
            tracks,
            ..MemoryStore::default()
        };
        (store, corpus)
    }

    fn ids(results: &[Recommendation]) -> Vec<&str> {
        results.iter().map(|r| r.track.id.as_str()).collect()
    }

    #[test]
    fn test_track_seed_returns_k_distinct_descending() {
        let (store, corpus) = setup(five_tracks());
        let recommender = Recommender::new(&store, &corpus);

        let results = recommender.by_track("a", 3).unwrap();
        assert_eq!(results.len(), 3);

        // Seed is in the corpus, so it is its own best match
        assert_eq!(results[0].track.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-9);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

        let mut unique = ids(&results);
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert!(results.iter().all(|r| r.track.is_reference()));
    }

    #[test]
    fn test_same_request_same_answer() {
        let (store, corpus) = setup(five_tracks());
        let recommender = Recommender::new(&store, &corpus);

        let first = recommender.by_track("d", 4).unwrap();
        let second = recommender.by_track("d", 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let (store, corpus) = setup(five_tracks());
        let results = Recommender::new(&store, &corpus).by_track("b", 0).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_preflight_bound_for_track() {
        let (store, corpus) = setup(five_tracks());
        let recommender = Recommender::new(&store, &corpus);

        match recommender.by_track("a", 5) {
            Err(RecommendError::InsufficientCorpus { required, available }) => {
                assert_eq!(required, 6);
                assert_eq!(available, 5);
            }
            other => panic!("expected InsufficientCorpus, got {other:?}"),
        }
        assert!(!corpus.is_materialized(), "bound is checked before any scoring");

        assert_eq!(recommender.by_track("a", 4).unwrap().len(), 4);
    }

    #[test]
    fn test_huge_count_fails_bound_without_scoring() {
        let (store, corpus) = setup(five_tracks());

        let err = Recommender::new(&store, &corpus).by_track("a", usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::InsufficientCorpus { required: usize::MAX, available: 5 }
        ));
        assert!(!corpus.is_materialized());
    }

    #[test]
    fn test_unknown_track_is_not_found() {
        let (store, corpus) = setup(five_tracks());
        let err = Recommender::new(&store, &corpus).by_track("zzz", 1).unwrap_err();
        assert!(matches!(err, RecommendError::NotFound { entity: Entity::Track, .. }));
    }

    #[test]
    fn test_user_track_is_rejected_before_corpus_access() {
        let (mut store, corpus) = setup(five_tracks());
        store.tracks.push(Track {
            origin: Origin::User(3),
            ..track_with("mine", [0.5; FEATURE_COUNT])
        });

        let err = Recommender::new(&store, &corpus).by_track("mine", 2).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::IneligibleSeed(IneligibleReason::UserSubmitted)
        ));
        assert!(!corpus.is_materialized());
        assert_eq!(store.track_lookups.get(), 1, "only the seed lookup happened");
    }

    fn album(id: &str, origin: Origin) -> Album {
        Album {
            id: id.to_string(),
            name: format!("Album {id}"),
            artists: "Artist".to_string(),
            number_of_tracks: 3,
            year: None,
            features: AudioFeatures::default(),
            origin,
        }
    }

    /// Corpus of the five tracks plus an album "alb" of three catalog-only tracks
    fn album_setup(second: [f64; FEATURE_COUNT], third: [f64; FEATURE_COUNT]) -> (MemoryStore, ReferenceCorpus) {
        let (mut store, corpus) = setup(five_tracks());
        for (id, values) in [
            ("x1", [0.6, 0.2, 0.3, 0.2, 0.2, 0.6, 110.0, -8.0, 1.0, 4.0]),
            ("x2", second),
            ("x3", third),
        ] {
            let mut track = track_with(id, values);
            track.album_id = "alb".to_string();
            store.tracks.push(track);
        }
        store.albums.insert("alb".to_string(), album("alb", Origin::Reference));
        (store, corpus)
    }

    #[test]
    fn test_album_ranks_by_first_track_only() {
        let (store, corpus) = album_setup([0.1; FEATURE_COUNT], [0.2; FEATURE_COUNT]);
        let baseline = Recommender::new(&store, &corpus).by_album("alb", 2).unwrap();

        let (store, corpus) = album_setup(
            [0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 10.0, -40.0, 0.0, 11.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 200.0, 0.0, 1.0, 0.0],
        );
        let changed = Recommender::new(&store, &corpus).by_album("alb", 2).unwrap();

        assert_eq!(baseline, changed, "tracks after the first must not affect results");
    }

    #[test]
    fn test_album_bound_counts_album_tracks() {
        let (store, corpus) = album_setup([0.1; FEATURE_COUNT], [0.2; FEATURE_COUNT]);
        let recommender = Recommender::new(&store, &corpus);

        assert_eq!(recommender.by_album("alb", 2).unwrap().len(), 2);
        assert!(matches!(
            recommender.by_album("alb", 3),
            Err(RecommendError::InsufficientCorpus { required: 6, available: 5 })
        ));
    }

    #[test]
    fn test_album_eligibility() {
        let (mut store, corpus) = setup(five_tracks());
        store.albums.insert("empty".to_string(), album("empty", Origin::Reference));
        store.albums.insert("mine".to_string(), album("mine", Origin::User(2)));
        let recommender = Recommender::new(&store, &corpus);

        assert!(matches!(
            recommender.by_album("empty", 1),
            Err(RecommendError::IneligibleSeed(IneligibleReason::EmptyAlbum))
        ));
        assert!(matches!(
            recommender.by_album("mine", 1),
            Err(RecommendError::IneligibleSeed(IneligibleReason::UserSubmitted))
        ));
        assert!(matches!(
            recommender.by_album("nope", 1),
            Err(RecommendError::NotFound { entity: Entity::Album, .. })
        ));
    }

    #[test]
    fn test_playlist_skips_user_tracks() {
        let (mut store, corpus) = setup(five_tracks());
        store.tracks.push(Track {
            origin: Origin::User(1),
            ..track_with("mine", [0.5; FEATURE_COUNT])
        });
        store.playlists.insert(7, vec!["mine".to_string(), "c".to_string()]);
        store.playlists.insert(8, vec!["mine".to_string()]);
        let recommender = Recommender::new(&store, &corpus);

        // "mine" is dropped, so "c" is the first query track
        let from_playlist = recommender.by_playlist(7, 2).unwrap();
        let from_track = recommender.by_track("c", 2).unwrap();
        assert_eq!(from_playlist, from_track);

        assert!(matches!(
            recommender.by_playlist(8, 1),
            Err(RecommendError::IneligibleSeed(IneligibleReason::NoReferenceTracks))
        ));
        assert!(matches!(
            recommender.by_playlist(99, 1),
            Err(RecommendError::NotFound { entity: Entity::Playlist, .. })
        ));
    }

    #[test]
    fn test_starred_list() {
        let (mut store, corpus) = setup(five_tracks());
        store.starred.insert(4, vec!["e".to_string(), "b".to_string()]);
        let recommender = Recommender::new(&store, &corpus);

        let results = recommender.by_starred(4, 3).unwrap();
        assert_eq!(results[0].track.id, "e");
        assert_eq!(results.len(), 3);

        assert!(matches!(
            recommender.by_starred(5, 1),
            Err(RecommendError::IneligibleSeed(IneligibleReason::NoReferenceTracks))
        ));
    }

    #[test]
    fn test_incomplete_query_track_is_invalid_feature() {
        let (mut store, corpus) = setup(five_tracks());
        let mut broken = track_with("broken", [0.5; FEATURE_COUNT]);
        broken.features.loudness = None;
        store.tracks.push(broken);

        let err = Recommender::new(&store, &corpus).by_track("broken", 1).unwrap_err();
        assert!(matches!(
            err,
            RecommendError::InvalidFeature { feature: "loudness", .. }
        ));
    }

    #[test]
    fn test_corpus_row_missing_from_store() {
        let corpus = ReferenceCorpus::from_tracks(five_tracks(), "test").unwrap();
        let store = MemoryStore {
            tracks: five_tracks().into_iter().filter(|t| t.id != "a").collect(),
            ..MemoryStore::default()
        };

        // "b" is closest to itself, then "a" which the store does not know
        let err = Recommender::new(&store, &corpus).by_track("b", 2).unwrap_err();
        assert!(matches!(err, RecommendError::NotFound { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_request_defaults_and_serde() {
        let request: RecommendRequest =
            serde_json::from_str(r#"{"mode":"album","seed_id":"xyz"}"#).unwrap();
        assert_eq!(request.seed, Seed::Album("xyz".to_string()));
        assert_eq!(request.count, DEFAULT_COUNT);

        let request: RecommendRequest =
            serde_json::from_str(r#"{"mode":"starred","seed_id":3,"count":4}"#).unwrap();
        assert_eq!(request, RecommendRequest::new(Seed::Starred(3)).with_count(4));
    }
}
