//! # Configuration Module
//!
//! Data directory setup and runtime settings for songrec.
//!
//! ## Data Storage
//!
//! The catalog database and the optional `config.json` live in the
//! platform-standard data directory:
//! - Linux: `~/.local/share/songrec/`
//! - macOS: `~/Library/Application Support/songrec/`
//! - Windows: `%APPDATA%\songrec\`
//!
//! ## Precedence
//!
//! Built-in defaults, then `config.json`, then environment variables and
//! command-line flags (merged by [`RuntimeConfig::apply_overrides`]).

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::recommend::DEFAULT_COUNT;

const APP_DIR: &str = "songrec";
const DB_FILE: &str = "catalog.db";
const CONFIG_FILE: &str = "config.json";

/// Returns the songrec data directory, creating it if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The songrec subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create songrec data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the platform-appropriate catalog database path.
///
/// ```no_run
/// use songrec::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Catalog location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// # Errors
///
/// See [`get_data_dir`].
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE))
}

/// Where the reference corpus is read from at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CorpusKind {
    /// Bulk reference CSV files
    #[default]
    Csv,
    /// Reference tracks already imported into the catalog store
    Store,
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the catalog database
    pub db_path: PathBuf,
    /// Bulk reference files, in load order
    pub song_files: Vec<PathBuf>,
    pub corpus_source: CorpusKind,
    /// Recommendations per request when none is given
    pub default_count: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            // Empty until resolved against the data directory by `load`
            db_path: PathBuf::new(),
            song_files: Vec::new(),
            corpus_source: CorpusKind::default(),
            default_count: DEFAULT_COUNT,
        }
    }
}

impl RuntimeConfig {
    /// Load `config.json` from the data directory, or defaults if absent.
    /// A database path the file leaves unset points into the data directory.
    pub fn load() -> Result<Self> {
        let data_dir = get_data_dir()?;
        Ok(Self::load_from(&data_dir.join(CONFIG_FILE))?.resolve_db_path(&data_dir))
    }

    /// Load a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn resolve_db_path(mut self, data_dir: &Path) -> Self {
        if self.db_path.as_os_str().is_empty() {
            self.db_path = data_dir.join(DB_FILE);
        }
        self
    }

    /// Create configuration with explicit database path
    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            ..Self::default()
        }
    }

    /// Layer command-line / environment values over the file values.
    /// Empty or absent overrides leave the current value alone.
    pub fn apply_overrides(&mut self, db_path: Option<PathBuf>, song_files: Vec<PathBuf>, corpus: Option<CorpusKind>) {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if !song_files.is_empty() {
            self.song_files = song_files;
        }
        if let Some(corpus) = corpus {
            self.corpus_source = corpus;
        }
    }
}
