use super::models::{
    ListeningEvent, Rating, TrackPlayStats, TrackRatingStats, PLAYED_COMPLETION_THRESHOLD,
};
use super::schema::USER_VERSIONED_SCHEMAS;
use super::user_store::{UserListeningStore, UserRatingStore, UserStore};
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref()).context("Failed to open user database")?;
        open_versioned(&mut conn, USER_VERSIONED_SCHEMAS)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let user_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened user store: {} users", user_count);

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn event_from_row(row: &Row) -> rusqlite::Result<ListeningEvent> {
        Ok(ListeningEvent {
            id: Some(row.get::<_, i64>(0)? as usize),
            user_id: row.get::<_, i64>(1)? as usize,
            track_id: row.get(2)?,
            session_id: row.get(3)?,
            played_at: row.get(4)?,
            play_duration_seconds: row.get(5)?,
            completion: row.get(6)?,
            source: row.get(7)?,
            date: row.get(8)?,
        })
    }
}

const EVENT_COLUMNS: &str =
    "id, user_id, track_id, session_id, played_at, play_duration_seconds, completion, source, date";

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO user (handle) VALUES (?1)", params![user_handle])
            .context("Failed to create user")?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|id| id as usize))
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let handle = conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(handle)
    }

    fn get_all_user_ids(&self) -> Result<Vec<usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM user ORDER BY id")?;
        let ids = stmt
            .query_map([], |r| r.get::<_, i64>(0))?
            .map(|r| r.map(|id| id as usize))
            .collect::<Result<_, _>>()?;
        Ok(ids)
    }
}

impl UserListeningStore for SqliteUserStore {
    fn record_listening_event(&self, event: ListeningEvent) -> Result<(usize, bool)> {
        let conn = self.conn.lock().unwrap();

        if let Some(session_id) = &event.session_id {
            let existing = conn
                .query_row(
                    "SELECT id FROM listening_events WHERE session_id = ?1",
                    params![session_id],
                    |r| r.get::<_, i64>(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok((id as usize, false));
            }
        }

        conn.execute(
            "INSERT INTO listening_events
                 (user_id, track_id, session_id, played_at, play_duration_seconds,
                  completion, source, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.user_id,
                event.track_id,
                event.session_id,
                event.played_at,
                event.play_duration_seconds,
                event.completion,
                event.source,
                event.date,
            ],
        )
        .context("Failed to record listening event")?;
        Ok((conn.last_insert_rowid() as usize, true))
    }

    fn get_user_listening_events(
        &self,
        user_id: usize,
        start_date: u32,
        end_date: u32,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM listening_events
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             ORDER BY played_at DESC LIMIT ?4",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(
                params![user_id, start_date, end_date, limit],
                Self::event_from_row,
            )?
            .collect::<Result<_, _>>()?;
        Ok(events)
    }

    fn get_listening_events_in_window(
        &self,
        start_date: u32,
        end_date: u32,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM listening_events
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY played_at ASC LIMIT ?3",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(params![start_date, end_date, limit], Self::event_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(events)
    }

    fn get_windowed_track_play_counts(
        &self,
        start_date: u32,
        end_date: u32,
    ) -> Result<Vec<TrackPlayStats>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT track_id, COUNT(*), COUNT(DISTINCT user_id)
             FROM listening_events
             WHERE date BETWEEN ?1 AND ?2 AND completion > ?3
             GROUP BY track_id",
        )?;
        let stats = stmt
            .query_map(
                params![start_date, end_date, PLAYED_COMPLETION_THRESHOLD],
                |row| {
                    Ok(TrackPlayStats {
                        track_id: row.get(0)?,
                        play_count: row.get::<_, i64>(1)? as u64,
                        unique_listeners: row.get::<_, i64>(2)? as u64,
                    })
                },
            )?
            .collect::<Result<_, _>>()?;
        Ok(stats)
    }

    fn get_events_after(&self, after_id: usize, limit: usize) -> Result<Vec<ListeningEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM listening_events WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
            EVENT_COLUMNS
        ))?;
        let events = stmt
            .query_map(params![after_id, limit], Self::event_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(events)
    }
}

impl UserRatingStore for SqliteUserStore {
    fn upsert_rating(&self, rating: Rating) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ratings (user_id, track_id, rating, is_loved, is_banned, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (user_id, track_id) DO UPDATE SET
                 rating = excluded.rating,
                 is_loved = excluded.is_loved,
                 is_banned = excluded.is_banned,
                 updated = excluded.updated",
            params![
                rating.user_id,
                rating.track_id,
                rating.rating,
                rating.is_loved,
                rating.is_banned,
                rating.updated_at,
            ],
        )
        .context("Failed to upsert rating")?;
        Ok(())
    }

    fn get_user_ratings(&self, user_id: usize) -> Result<Vec<Rating>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, track_id, rating, is_loved, is_banned, updated
             FROM ratings WHERE user_id = ?1",
        )?;
        let ratings = stmt
            .query_map(params![user_id], |row| {
                Ok(Rating {
                    user_id: row.get::<_, i64>(0)? as usize,
                    track_id: row.get(1)?,
                    rating: row.get(2)?,
                    is_loved: row.get(3)?,
                    is_banned: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(ratings)
    }

    fn get_banned_track_ids(&self, user_id: usize) -> Result<HashSet<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT track_id FROM ratings WHERE user_id = ?1 AND is_banned = 1")?;
        let ids = stmt
            .query_map(params![user_id], |r| r.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;
        Ok(ids)
    }

    fn get_loved_pairs(&self) -> Result<Vec<(usize, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT user_id, track_id FROM ratings WHERE is_loved = 1")?;
        let pairs = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, String>(1)?))
            })?
            .collect::<Result<_, _>>()?;
        Ok(pairs)
    }

    fn get_track_rating_stats(&self) -> Result<Vec<TrackRatingStats>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT track_id, AVG(rating), COUNT(rating)
             FROM ratings
             WHERE rating IS NOT NULL AND is_banned = 0
             GROUP BY track_id",
        )?;
        let stats = stmt
            .query_map([], |row| {
                Ok(TrackRatingStats {
                    track_id: row.get(0)?,
                    average_rating: row.get(1)?,
                    rating_count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (SqliteUserStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        (store, dir)
    }

    fn event(user_id: usize, track_id: &str, session_id: Option<&str>) -> ListeningEvent {
        ListeningEvent {
            id: None,
            user_id,
            track_id: track_id.to_string(),
            session_id: session_id.map(str::to_string),
            played_at: 1_700_000_000,
            play_duration_seconds: 180,
            completion: 0.9,
            source: Some("album".to_string()),
            date: 20231114,
        }
    }

    #[test]
    fn record_listening_event_is_idempotent_on_session_id() {
        let (store, _dir) = test_store();
        let user_id = store.create_user("ada").unwrap();

        let (id1, created1) = store
            .record_listening_event(event(user_id, "t1", Some("session-a")))
            .unwrap();
        let (id2, created2) = store
            .record_listening_event(event(user_id, "t1", Some("session-a")))
            .unwrap();

        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
    }

    #[test]
    fn windowed_play_counts_ignore_partial_plays() {
        let (store, _dir) = test_store();
        let user_id = store.create_user("ada").unwrap();

        store
            .record_listening_event(event(user_id, "t1", None))
            .unwrap();
        let mut skipped = event(user_id, "t1", None);
        skipped.completion = 0.3;
        store.record_listening_event(skipped).unwrap();

        let stats = store
            .get_windowed_track_play_counts(20231101, 20231130)
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].play_count, 1);
    }

    #[test]
    fn upsert_rating_overwrites() {
        let (store, _dir) = test_store();
        let user_id = store.create_user("ada").unwrap();

        let mut rating = Rating {
            user_id,
            track_id: "t1".to_string(),
            rating: Some(3),
            is_loved: false,
            is_banned: false,
            updated_at: 1_700_000_000,
        };
        store.upsert_rating(rating.clone()).unwrap();
        rating.rating = Some(5);
        rating.is_loved = true;
        store.upsert_rating(rating).unwrap();

        let ratings = store.get_user_ratings(user_id).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating, Some(5));
        assert!(ratings[0].is_loved);
    }

    #[test]
    fn banned_tracks_are_listed() {
        let (store, _dir) = test_store();
        let user_id = store.create_user("ada").unwrap();

        store
            .upsert_rating(Rating {
                user_id,
                track_id: "t9".to_string(),
                rating: None,
                is_loved: false,
                is_banned: true,
                updated_at: 1_700_000_000,
            })
            .unwrap();

        let banned = store.get_banned_track_ids(user_id).unwrap();
        assert!(banned.contains("t9"));
        assert_eq!(banned.len(), 1);
    }
}
