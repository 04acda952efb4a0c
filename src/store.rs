//! # Catalog Store
//!
//! The engine reads catalog records through the [`CatalogStore`] trait and
//! never writes. [`SqliteCatalogStore`] is the bundled implementation; it
//! also carries the write operations the CLI needs to seed playlists,
//! starred lists and bulk imports.
//!
//! ## Schema
//!
//! - `songs`: reference and user-submitted tracks, `owner_id` 0 = reference
//! - `albums`: album records with per-album aggregate features
//! - `playlists` / `playlist_song`: user playlists, ordered by `position`
//! - `starred`: per-user starred tracks, ordered by insertion

use crate::track::{Album, AudioFeatures, Origin, Playlist, Track};
use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Read-only catalog lookups the recommendation engine depends on.
///
/// Every lookup returns `Ok(None)` (or an empty list) for ids that do not
/// exist; `Err` is reserved for storage failures.
pub trait CatalogStore {
    /// Look up a single track
    fn get_track(&self, id: &str) -> Result<Option<Track>>;

    /// Look up an album record (without its tracks)
    fn get_album(&self, id: &str) -> Result<Option<Album>>;

    /// Tracks belonging to an album, in catalog order
    fn get_album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;

    /// Look up a playlist with its tracks
    fn get_playlist(&self, id: i64) -> Result<Option<Playlist>>;

    /// A user's starred tracks, in the order they were starred
    fn get_starred(&self, user_id: i64) -> Result<Vec<Track>>;

    /// Every reference-origin track, in catalog order
    fn reference_tracks(&self) -> Result<Vec<Track>>;
}

const SONG_COLUMNS: &str = "id, name, album, album_id, artists, year, \
    danceability, speechiness, acousticness, instrumentalness, liveness, \
    valence, tempo, loudness, mode, key, owner_id";

const ALBUM_COLUMNS: &str = "id, name, artists, number_of_tracks, year, \
    danceability, speechiness, acousticness, instrumentalness, liveness, \
    valence, tempo, loudness, mode, key, owner_id";

/// `SQLite` backed catalog
#[derive(Debug)]
pub struct SqliteCatalogStore {
    conn: Connection,
}

impl SqliteCatalogStore {
    /// Open (or create) the catalog database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open catalog database at {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        debug!("Opened catalog database at {}", path.display());
        Ok(store)
    }

    /// In-memory catalog, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory catalog")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS songs (
                    id               TEXT PRIMARY KEY,
                    name             TEXT NOT NULL,
                    album            TEXT NOT NULL,
                    album_id         TEXT NOT NULL,
                    artists          TEXT NOT NULL,
                    year             INTEGER,
                    danceability     REAL,
                    speechiness      REAL,
                    acousticness     REAL,
                    instrumentalness REAL,
                    liveness         REAL,
                    valence          REAL,
                    tempo            REAL,
                    loudness         REAL,
                    mode             INTEGER,
                    key              INTEGER,
                    owner_id         INTEGER NOT NULL DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS idx_songs_album_id ON songs(album_id);
                CREATE INDEX IF NOT EXISTS idx_songs_owner_id ON songs(owner_id);

                CREATE TABLE IF NOT EXISTS albums (
                    id               TEXT PRIMARY KEY,
                    name             TEXT NOT NULL,
                    artists          TEXT NOT NULL,
                    number_of_tracks INTEGER NOT NULL,
                    year             INTEGER,
                    danceability     REAL,
                    speechiness      REAL,
                    acousticness     REAL,
                    instrumentalness REAL,
                    liveness         REAL,
                    valence          REAL,
                    tempo            REAL,
                    loudness         REAL,
                    mode             INTEGER,
                    key              INTEGER,
                    owner_id         INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS playlists (
                    id       INTEGER PRIMARY KEY,
                    name     TEXT NOT NULL,
                    owner_id INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS playlist_song (
                    playlist_id INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                    song_id     TEXT NOT NULL REFERENCES songs(id),
                    position    INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_playlist_song ON playlist_song(playlist_id);

                CREATE TABLE IF NOT EXISTS starred (
                    user_id INTEGER NOT NULL,
                    song_id TEXT NOT NULL REFERENCES songs(id),
                    UNIQUE(user_id, song_id)
                );",
            )
            .context("Failed to create catalog schema")
    }

    /// Insert or replace a track
    pub fn insert_track(&self, track: &Track) -> Result<()> {
        insert_track_with(&self.conn, track)
    }

    /// Insert or replace an album record
    pub fn insert_album(&self, album: &Album) -> Result<()> {
        insert_album_with(&self.conn, album)
    }

    /// Insert tracks and albums in one transaction, optionally clearing the
    /// existing songs and albums first.
    pub fn import(&mut self, tracks: &[Track], albums: &[Album], replace: bool) -> Result<()> {
        let tx = self.conn.transaction()?;

        if replace {
            tx.execute_batch("DELETE FROM playlist_song; DELETE FROM starred; DELETE FROM songs; DELETE FROM albums;")
                .context("Failed to clear catalog before import")?;
        }

        for track in tracks {
            insert_track_with(&tx, track)?;
        }
        for album in albums {
            insert_album_with(&tx, album)?;
        }

        tx.commit().context("Committing catalog import failed")?;
        info!("Imported {} songs and {} albums", tracks.len(), albums.len());
        Ok(())
    }

    /// Create an empty playlist, returning its id
    pub fn create_playlist(&self, name: &str, owner_id: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO playlists (name, owner_id) VALUES (?1, ?2)",
                params![name, owner_id],
            )
            .with_context(|| format!("Failed to create playlist '{name}'"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a song to the end of a playlist
    pub fn add_to_playlist(&self, playlist_id: i64, song_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO playlist_song (playlist_id, song_id, position)
                 VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1
                                  FROM playlist_song WHERE playlist_id = ?1))",
                params![playlist_id, song_id],
            )
            .with_context(|| format!("Failed to add song {song_id} to playlist {playlist_id}"))?;
        Ok(())
    }

    /// Star a song for a user. Starring twice is a no-op.
    pub fn star_track(&self, user_id: i64, song_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO starred (user_id, song_id) VALUES (?1, ?2)",
                params![user_id, song_id],
            )
            .with_context(|| format!("Failed to star song {song_id} for user {user_id}"))?;
        Ok(())
    }

    /// Remove a song from a user's starred list
    pub fn unstar_track(&self, user_id: i64, song_id: &str) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM starred WHERE user_id = ?1 AND song_id = ?2",
                params![user_id, song_id],
            )
            .with_context(|| format!("Failed to unstar song {song_id} for user {user_id}"))?;
        Ok(())
    }

    fn query_tracks(&self, sql: &str, param: impl rusqlite::ToSql) -> Result<Vec<Track>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("Invalid SQL statement: {sql}"))?;

        let tracks = stmt
            .query_map([param], track_from_row)
            .context("Cannot query songs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Queried song conversion failed")?;
        Ok(tracks)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_track(&self, id: &str) -> Result<Option<Track>> {
        self.conn
            .query_row(
                &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
                [id],
                track_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to query song {id}"))
    }

    fn get_album(&self, id: &str) -> Result<Option<Album>> {
        self.conn
            .query_row(
                &format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = ?1"),
                [id],
                album_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to query album {id}"))
    }

    fn get_album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        self.query_tracks(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE album_id = ?1 ORDER BY rowid"),
            album_id,
        )
    }

    fn get_playlist(&self, id: i64) -> Result<Option<Playlist>> {
        let header = self
            .conn
            .query_row(
                "SELECT name, owner_id FROM playlists WHERE id = ?1",
                [id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to query playlist {id}"))?;

        let Some((name, owner_id)) = header else {
            return Ok(None);
        };

        let columns = SONG_COLUMNS
            .split(", ")
            .map(|c| format!("s.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let tracks = self.query_tracks(
            &format!(
                "SELECT {columns} FROM playlist_song p JOIN songs s ON s.id = p.song_id
                 WHERE p.playlist_id = ?1 ORDER BY p.position"
            ),
            id,
        )?;

        Ok(Some(Playlist {
            id,
            name,
            owner_id,
            tracks,
        }))
    }

    fn get_starred(&self, user_id: i64) -> Result<Vec<Track>> {
        let columns = SONG_COLUMNS
            .split(", ")
            .map(|c| format!("s.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.query_tracks(
            &format!(
                "SELECT {columns} FROM starred st JOIN songs s ON s.id = st.song_id
                 WHERE st.user_id = ?1 ORDER BY st.rowid"
            ),
            user_id,
        )
    }

    fn reference_tracks(&self) -> Result<Vec<Track>> {
        self.query_tracks(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE owner_id = ?1 ORDER BY rowid"),
            crate::track::SYSTEM_OWNER,
        )
    }
}

fn features_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<AudioFeatures> {
    Ok(AudioFeatures {
        danceability: row.get(offset)?,
        speechiness: row.get(offset + 1)?,
        acousticness: row.get(offset + 2)?,
        instrumentalness: row.get(offset + 3)?,
        liveness: row.get(offset + 4)?,
        valence: row.get(offset + 5)?,
        tempo: row.get(offset + 6)?,
        loudness: row.get(offset + 7)?,
        mode: row.get(offset + 8)?,
        key: row.get(offset + 9)?,
    })
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        name: row.get(1)?,
        album: row.get(2)?,
        album_id: row.get(3)?,
        artists: row.get(4)?,
        year: row.get(5)?,
        features: features_from_row(row, 6)?,
        origin: Origin::from_owner_id(row.get(16)?),
    })
}

fn album_from_row(row: &Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        name: row.get(1)?,
        artists: row.get(2)?,
        number_of_tracks: row.get(3)?,
        year: row.get(4)?,
        features: features_from_row(row, 5)?,
        origin: Origin::from_owner_id(row.get(15)?),
    })
}

fn insert_track_with(conn: &Connection, track: &Track) -> Result<()> {
    let f = &track.features;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO songs ({SONG_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            track.id,
            track.name,
            track.album,
            track.album_id,
            track.artists,
            track.year,
            f.danceability,
            f.speechiness,
            f.acousticness,
            f.instrumentalness,
            f.liveness,
            f.valence,
            f.tempo,
            f.loudness,
            f.mode,
            f.key,
            track.origin.owner_id(),
        ],
    )
    .with_context(|| format!("Failed to insert song {}", track.id))?;
    Ok(())
}

fn insert_album_with(conn: &Connection, album: &Album) -> Result<()> {
    let f = &album.features;
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO albums ({ALBUM_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            album.id,
            album.name,
            album.artists,
            album.number_of_tracks,
            album.year,
            f.danceability,
            f.speechiness,
            f.acousticness,
            f.instrumentalness,
            f.liveness,
            f.valence,
            f.tempo,
            f.loudness,
            f.mode,
            f.key,
            album.origin.owner_id(),
        ],
    )
    .with_context(|| format!("Failed to insert album {}", album.id))?;
    Ok(())
}
