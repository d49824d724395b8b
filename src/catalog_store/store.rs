//! SQLite-backed catalog store implementation.

use super::models::{ArtistRelationship, GenreWeight, RelationshipType, Track};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{CatalogStore, WritableCatalogStore};
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite-backed catalog store.
///
/// A single write connection plus a small pool of read connections, all in
/// WAL mode, so aggregate reads from concurrent requests don't serialize
/// behind writes from the sync pipeline.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        open_versioned(&mut write_conn, CATALOG_VERSIONED_SCHEMAS)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let track_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened catalog: {} tracks", track_count);

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: row.get(0)?,
            title: row.get(1)?,
            artist_id: row.get(2)?,
            album_id: row.get(3)?,
            duration_seconds: row.get(4)?,
            play_count: row.get::<_, i64>(5)? as u64,
            love_count: row.get::<_, i64>(6)? as u64,
            last_played_at: row
                .get::<_, Option<i64>>(7)?
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            genres: Vec::new(),
        })
    }
}

const TRACK_COLUMNS: &str =
    "id, title, artist_id, album_id, duration_seconds, play_count, love_count, last_played_at";

impl CatalogStore for SqliteCatalogStore {
    fn get_track(&self, id: &str) -> Result<Option<Track>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let track = conn
            .query_row(
                &format!("SELECT {} FROM tracks WHERE id = ?1", TRACK_COLUMNS),
                params![id],
                Self::track_from_row,
            )
            .optional()
            .context("Failed to query track")?;

        let Some(mut track) = track else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT genre, weight FROM track_genres WHERE track_id = ?1")?;
        track.genres = stmt
            .query_map(params![id], |row| {
                Ok(GenreWeight {
                    genre: row.get(0)?,
                    weight: row.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        Ok(Some(track))
    }

    fn list_tracks(&self, limit: usize) -> Result<Vec<Track>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tracks ORDER BY id LIMIT ?1",
            TRACK_COLUMNS
        ))?;
        let mut tracks: Vec<Track> = stmt
            .query_map(params![limit], Self::track_from_row)?
            .collect::<Result<_, _>>()?;

        // One scan over the tag table instead of a query per track.
        let mut genres_by_track: HashMap<String, Vec<GenreWeight>> = HashMap::new();
        let mut stmt = conn.prepare("SELECT track_id, genre, weight FROM track_genres")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                GenreWeight {
                    genre: row.get(1)?,
                    weight: row.get(2)?,
                },
            ))
        })?;
        for row in rows {
            let (track_id, genre) = row?;
            genres_by_track.entry(track_id).or_default().push(genre);
        }

        for track in &mut tracks {
            if let Some(genres) = genres_by_track.remove(&track.id) {
                track.genres = genres;
            }
        }
        Ok(tracks)
    }

    fn get_tracks_count(&self) -> usize {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    fn get_artist_relationships(&self, artist_id: &str) -> Result<Vec<ArtistRelationship>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT artist_id, related_artist_id, relationship_type, strength
             FROM artist_relationships WHERE artist_id = ?1",
        )?;
        let rows = stmt.query_map(params![artist_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut relationships = Vec::new();
        for row in rows {
            let (artist_id, related_artist_id, type_str, strength) = row?;
            // Rows written by a newer sync pipeline may carry types this
            // build doesn't know; skip them rather than failing the read.
            if let Some(relationship_type) = RelationshipType::parse(&type_str) {
                relationships.push(ArtistRelationship {
                    artist_id,
                    related_artist_id,
                    relationship_type,
                    strength,
                });
            }
        }
        Ok(relationships)
    }

    fn bottom_quartile_play_count(&self) -> Result<u64> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))?;
        if count == 0 {
            return Ok(0);
        }

        let threshold: i64 = conn.query_row(
            "SELECT play_count FROM tracks ORDER BY play_count ASC LIMIT 1 OFFSET ?1",
            params![count / 4],
            |r| r.get(0),
        )?;
        Ok(threshold as u64)
    }
}

impl WritableCatalogStore for SqliteCatalogStore {
    fn insert_track(&self, track: &Track) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (id, title, artist_id, album_id, duration_seconds,
                                 play_count, love_count, last_played_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                track.id,
                track.title,
                track.artist_id,
                track.album_id,
                track.duration_seconds,
                track.play_count as i64,
                track.love_count as i64,
                track.last_played_at.map(|t| t.timestamp()),
            ],
        )
        .context("Failed to insert track")?;

        for genre in &track.genres {
            conn.execute(
                "INSERT INTO track_genres (track_id, genre, weight) VALUES (?1, ?2, ?3)",
                params![track.id, genre.genre, genre.weight],
            )?;
        }
        Ok(())
    }

    fn insert_artist_relationship(&self, relationship: &ArtistRelationship) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artist_relationships
                 (artist_id, related_artist_id, relationship_type, strength)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                relationship.artist_id,
                relationship.related_artist_id,
                relationship.relationship_type.as_str(),
                relationship.strength,
            ],
        )
        .context("Failed to insert artist relationship")?;
        Ok(())
    }

    fn set_track_counters(
        &self,
        track_id: &str,
        play_count: u64,
        love_count: u64,
        last_played_at: Option<i64>,
    ) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "UPDATE tracks SET play_count = ?2, love_count = ?3, last_played_at = ?4
             WHERE id = ?1",
            params![track_id, play_count as i64, love_count as i64, last_played_at],
        )
        .context("Failed to update track counters")?;
        Ok(())
    }
}
