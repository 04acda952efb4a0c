//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `songrec` binary.
//!
//! ## Commands
//!
//! - `import`: Load bulk reference CSV files into the catalog
//! - `recommend`: Similar tracks for a song, album, playlist or starred list
//! - `playlist`, `star`, `unstar`: Maintain user playlists and starred lists
//! - `corpus`: Show the reference corpus in use
//!
//! ## Examples
//!
//! ```bash
//! songrec import tracks_features.csv
//! songrec --song-file tracks_features.csv recommend song 7lmeHLHBe4nmXzuXc0HDjk -n 5
//! songrec --corpus store recommend starred --user 3
//! ```

use crate::config::CorpusKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "songrec")]
#[command(about = "songrec: content-based track recommendations from audio features")]
#[command(version)]
pub struct Args {
    /// Catalog database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "SONGREC_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Bulk reference CSV file for the corpus; repeat for several files
    #[arg(
        long = "song-file",
        global = true,
        env = "SONGREC_SONG_FILES",
        value_delimiter = ',',
        value_hint = clap::ValueHint::FilePath
    )]
    pub song_files: Vec<PathBuf>,

    /// Where the reference corpus is loaded from
    #[arg(long, global = true, env = "SONGREC_CORPUS", value_enum)]
    pub corpus: Option<CorpusKind>,

    /// Print results as JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import bulk reference CSV files into the catalog
    ///
    /// Every row becomes a reference song. Rows sharing an album id are
    /// folded into a reference album with averaged features.
    Import {
        /// CSV files to import, in order
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,

        /// Clear existing songs, albums, playlist entries and stars first
        #[arg(long)]
        force: bool,
    },

    /// Recommend tracks similar to a seed
    Recommend {
        #[command(subcommand)]
        seed: SeedCommand,
    },

    /// Manage user playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Star a song for a user
    Star {
        song: String,
        #[arg(long)]
        user: i64,
    },

    /// Remove a song from a user's starred list
    Unstar {
        song: String,
        #[arg(long)]
        user: i64,
    },

    /// Load the reference corpus and print its size and source
    Corpus,

    /// Generate shell completions
    ///
    /// Usage: songrec completion bash > ~/.local/share/bash-completion/completions/songrec
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// What to base recommendations on
#[derive(Subcommand, Debug)]
pub enum SeedCommand {
    /// Tracks similar to one reference song
    Song {
        id: String,
        /// Number of recommendations
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Tracks similar to a reference album
    Album {
        id: String,
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Tracks similar to a playlist's reference songs
    Playlist {
        id: i64,
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Tracks similar to a user's starred reference songs
    Starred {
        #[arg(long)]
        user: i64,
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

/// Playlist maintenance actions
#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Create an empty playlist and print its id
    Create {
        name: String,
        #[arg(long)]
        owner: i64,
    },
    /// Append a song to a playlist
    Add { playlist: i64, song: String },
}
