//! # songrec
//!
//! Command-line front end for the recommendation engine.
//!
//! ## Usage
//!
//! ```bash
//! # Populate the catalog from bulk reference files
//! songrec import tracks_features.csv
//!
//! # Recommend from the bulk files (default corpus source)
//! songrec --song-file tracks_features.csv recommend album 2fGCAYUMssLKiUAoNdxGLx
//!
//! # Recommend from the reference tracks in the catalog instead
//! songrec --corpus store recommend playlist 4 -n 20
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use songrec::cli::{Args, Command, PlaylistAction, SeedCommand};
use songrec::config::{CorpusKind, RuntimeConfig};
use songrec::corpus::{self, CorpusSource, ReferenceCorpus};
use songrec::recommend::{Recommendation, RecommendRequest, Recommender, Seed};
use songrec::store::{CatalogStore, SqliteCatalogStore};
use songrec::{completion, import};

/// Load the reference corpus once for this process.
///
/// Any failure here aborts before a single recommendation is served.
fn ensure_corpus_ready(config: &RuntimeConfig, store: &dyn CatalogStore) -> Result<&'static ReferenceCorpus> {
    if let Some(corpus) = corpus::global() {
        return Ok(corpus);
    }

    let source = match config.corpus_source {
        CorpusKind::Csv => {
            if config.song_files.is_empty() {
                anyhow::bail!(
                    "No reference song files configured. Pass --song-file, set SONGREC_SONG_FILES, \
                     or use --corpus store after running 'songrec import'."
                );
            }
            CorpusSource::Csv(&config.song_files)
        }
        CorpusKind::Store => CorpusSource::Store(store),
    };

    debug!("Initializing reference corpus from {source:?}");
    corpus::initialize_from(source).context("Failed to build the reference corpus")
}

fn print_recommendations(results: &[Recommendation], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No recommendations.");
        return Ok(());
    }

    println!("{:>3}  {:>6}  {:<24}  {:<40}  {}", "#", "score", "id", "name", "artists");
    for (rank, rec) in results.iter().enumerate() {
        println!(
            "{:>3}  {:>6.4}  {:<24}  {:<40}  {}",
            rank + 1,
            rec.score,
            rec.track.id,
            rec.track.name,
            rec.track.artists
        );
    }
    Ok(())
}

fn seed_request(seed: SeedCommand, default_count: usize) -> RecommendRequest {
    let (seed, count) = match seed {
        SeedCommand::Song { id, count } => (Seed::Track(id), count),
        SeedCommand::Album { id, count } => (Seed::Album(id), count),
        SeedCommand::Playlist { id, count } => (Seed::Playlist(id), count),
        SeedCommand::Starred { user, count } => (Seed::Starred(user), count),
    };
    RecommendRequest::new(seed).with_count(count.unwrap_or(default_count))
}

/// Main entry point for songrec.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug songrec recommend song <id>`
/// - `RUST_LOG=songrec::selector=trace songrec recommend album <id>`
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = RuntimeConfig::load()?;
    config.apply_overrides(args.db, args.song_files, args.corpus);
    debug!("Runtime configuration: {config:?}");

    match args.command {
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
        Command::Import { files, force } => {
            info!("Importing reference songs into {}", config.db_path.display());
            let mut store = SqliteCatalogStore::open(&config.db_path)?;
            let summary = import::import_files(&mut store, &files, force)?;
            println!("Imported {} songs and {} albums", summary.songs, summary.albums);
        }
        Command::Recommend { seed } => {
            let store = SqliteCatalogStore::open(&config.db_path)?;
            let corpus = ensure_corpus_ready(&config, &store)?;
            let request = seed_request(seed, config.default_count);

            let results = Recommender::new(&store, corpus)
                .recommend(&request)
                .with_context(|| format!("Cannot recommend for {}", request.seed))?;
            print_recommendations(&results, args.json)?;
        }
        Command::Playlist { action } => {
            let store = SqliteCatalogStore::open(&config.db_path)?;
            match action {
                PlaylistAction::Create { name, owner } => {
                    let id = store.create_playlist(&name, owner)?;
                    println!("{id}");
                }
                PlaylistAction::Add { playlist, song } => {
                    store.add_to_playlist(playlist, &song)?;
                }
            }
        }
        Command::Star { song, user } => {
            SqliteCatalogStore::open(&config.db_path)?.star_track(user, &song)?;
        }
        Command::Unstar { song, user } => {
            SqliteCatalogStore::open(&config.db_path)?.unstar_track(user, &song)?;
        }
        Command::Corpus => {
            let store = SqliteCatalogStore::open(&config.db_path)?;
            let corpus = ensure_corpus_ready(&config, &store)?;
            if args.json {
                let summary = serde_json::json!({
                    "tracks": corpus.len(),
                    "source": corpus.description(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} reference tracks from {}", corpus.len(), corpus.description());
            }
        }
    }
    Ok(())
}
