//! # Bulk Reference Import
//!
//! Loads bulk CSV files into the catalog store as reference data. Every row
//! becomes a reference song; rows sharing an `album_id` are folded into one
//! reference album whose features summarize its tracks:
//!
//! - continuous features: mean of the values present
//! - `mode` and `key`: most frequent value, smallest value on ties
//! - `artists`: union of the tracks' artists in first-seen order
//!
//! Albums are emitted in first-appearance order of their `album_id`.

use crate::corpus::read_reference_csv;
use crate::store::SqliteCatalogStore;
use crate::track::{Album, AudioFeatures, Origin, Track};
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub songs: usize,
    pub albums: usize,
}

/// Read `files` and write their songs and derived albums into `store`.
///
/// With `force`, existing songs, albums, playlist entries and stars are
/// removed first. Nothing is written if any file fails to parse.
pub fn import_files(store: &mut SqliteCatalogStore, files: &[PathBuf], force: bool) -> Result<ImportSummary> {
    let mut tracks = Vec::new();
    for file in files {
        let rows = read_reference_csv(file).with_context(|| format!("Failed to read {}", file.display()))?;
        tracks.extend(rows);
    }

    let albums = aggregate_albums(&tracks);
    info!(
        "Importing {} songs in {} albums from {} file(s)",
        tracks.len(),
        albums.len(),
        files.len()
    );

    store.import(&tracks, &albums, force)?;
    Ok(ImportSummary {
        songs: tracks.len(),
        albums: albums.len(),
    })
}

/// Group tracks by `album_id` into reference albums
#[must_use]
pub fn aggregate_albums(tracks: &[Track]) -> Vec<Album> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Track>> = HashMap::new();
    for track in tracks {
        let group = groups.entry(track.album_id.as_str()).or_default();
        if group.is_empty() {
            order.push(track.album_id.as_str());
        }
        group.push(track);
    }

    order
        .into_iter()
        .filter_map(|album_id| groups.get(album_id).map(|group| album_from_group(album_id, group)))
        .collect()
}

fn album_from_group(album_id: &str, group: &[&Track]) -> Album {
    debug!("Aggregating album {album_id} from {} tracks", group.len());
    let first = group[0];

    let mut artists: Vec<String> = Vec::new();
    for track in group {
        for artist in split_artists(&track.artists) {
            if !artists.contains(&artist) {
                artists.push(artist);
            }
        }
    }

    Album {
        id: album_id.to_string(),
        name: first.album.clone(),
        artists: format_artists(&artists),
        number_of_tracks: i64::try_from(group.len()).unwrap_or(i64::MAX),
        year: group.iter().find_map(|t| t.year),
        features: AudioFeatures {
            danceability: mean_of(group, |f| f.danceability),
            speechiness: mean_of(group, |f| f.speechiness),
            acousticness: mean_of(group, |f| f.acousticness),
            instrumentalness: mean_of(group, |f| f.instrumentalness),
            liveness: mean_of(group, |f| f.liveness),
            valence: mean_of(group, |f| f.valence),
            tempo: mean_of(group, |f| f.tempo),
            loudness: mean_of(group, |f| f.loudness),
            mode: mode_of(group, |f| f.mode),
            key: mode_of(group, |f| f.key),
        },
        origin: Origin::Reference,
    }
}

fn mean_of(group: &[&Track], get: fn(&AudioFeatures) -> Option<f64>) -> Option<f64> {
    mean(group.iter().filter_map(|t| get(&t.features)))
}

fn mode_of(group: &[&Track], get: fn(&AudioFeatures) -> Option<i64>) -> Option<i64> {
    statistical_mode(group.iter().filter_map(|t| get(&t.features)))
}

/// Mean of the values present, `None` if there are none
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

/// Most frequent value; the smallest one wins a tie
fn statistical_mode(values: impl Iterator<Item = i64>) -> Option<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    // BTreeMap iterates ascending, max_by_key keeps the last maximum
    counts
        .into_iter()
        .rev()
        .max_by_key(|&(_, count)| count)
        .map(|(value, _)| value)
}

/// Artists are stored as a list literal like `['A', 'B']`; plain names pass through
fn split_artists(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(|part| part.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn format_artists(artists: &[String]) -> String {
    let quoted: Vec<String> = artists.iter().map(|a| format!("'{a}'")).collect();
    format!("[{}]", quoted.join(", "))
}
