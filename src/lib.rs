//! Content-based track recommendations from acoustic features.
//!
//! Every track is projected into a 10-dimensional feature space
//! (danceability, speechiness, acousticness, instrumentalness, liveness,
//! valence, tempo, loudness, mode, key). A request names a seed (a track, an
//! album, a playlist or a user's starred list); the engine scores a fixed
//! reference corpus against the seed with cosine similarity and returns the
//! `K` best distinct corpus tracks, best first.
//!
//! Core modules:
//! - [`features`] - Feature vectors and extraction
//! - [`corpus`] - Process-wide reference corpus, loaded once
//! - [`similarity`] - Cosine similarity matrix
//! - [`selector`] - Greedy top-K selection
//! - [`recommend`] - Seed resolution and the recommendation flow
//!
//! ### Supporting Modules
//!
//! - [`store`] - Catalog store trait and `SQLite` implementation
//! - [`import`] - Bulk CSV import into the catalog
//! - [`track`] - Catalog record types
//! - [`error`] - Engine and startup error types
//! - [`config`] - Data directory and runtime configuration
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use songrec::corpus::{self, CorpusSource};
//! use songrec::recommend::Recommender;
//! use songrec::store::SqliteCatalogStore;
//! use std::path::PathBuf;
//!
//! let store = SqliteCatalogStore::open(&songrec::config::get_db_path()?)?;
//! let files = vec![PathBuf::from("tracks_features.csv")];
//! let corpus = corpus::initialize_from(CorpusSource::Csv(&files))?;
//!
//! for rec in Recommender::new(&store, corpus).by_track("7lmeHLHBe4nmXzuXc0HDjk", 5)? {
//!     println!("{:.3} {}", rec.score, rec.track.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Ranking Notes
//!
//! - Only the first query track's similarity row drives selection. Album,
//!   playlist and starred seeds rank against their first eligible track.
//! - The corpus must hold at least `query tracks + K` rows or the request
//!   fails with [`error::RecommendError::InsufficientCorpus`].
//! - Seeds are not excluded; a seed that is in the corpus is usually its
//!   own top result.
//!
//! ## Logging
//!
//! All modules log through the `log` facade; the binary initializes
//! `env_logger`, so `RUST_LOG=songrec=debug` shows corpus loading and
//! per-request decisions.

pub mod cli;
pub mod completion;
pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod import;
pub mod recommend;
pub mod selector;
pub mod similarity;
pub mod store;
pub mod track;
