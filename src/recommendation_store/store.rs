//! SQLite-backed recommendation store implementation.

use super::models::{Recommendation, RecommendationType};
use super::schema::RECOMMENDATION_VERSIONED_SCHEMAS;
use super::trait_def::RecommendationStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteRecommendationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecommendationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .context("Failed to open recommendation database")?;
        open_versioned(&mut conn, RECOMMENDATION_VERSIONED_SCHEMAS)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(SqliteRecommendationStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn recommendation_from_row(row: &Row) -> rusqlite::Result<Recommendation> {
        let type_str: String = row.get(3)?;
        let metadata: Option<String> = row.get(6)?;
        Ok(Recommendation {
            id: row.get(0)?,
            user_id: row.get::<_, i64>(1)? as usize,
            track_id: row.get(2)?,
            recommendation_type: RecommendationType::parse(&type_str)
                .unwrap_or(RecommendationType::Popularity),
            score: row.get(4)?,
            reason: row.get(5)?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            is_consumed: row.get(7)?,
            consumed_at: row
                .get::<_, Option<i64>>(8)?
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            created_at: DateTime::<Utc>::from_timestamp(row.get(9)?, 0).unwrap_or_default(),
            expires_at: DateTime::<Utc>::from_timestamp(row.get(10)?, 0).unwrap_or_default(),
        })
    }
}

const RECOMMENDATION_COLUMNS: &str = "id, user_id, track_id, recommendation_type, score, reason, \
     metadata, is_consumed, consumed_at, created_at, expires_at";

impl RecommendationStore for SqliteRecommendationStore {
    fn upsert_recommendations(&self, recommendations: &[Recommendation]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for rec in recommendations {
            let metadata = rec
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m))
                .transpose()?;
            tx.execute(
                "INSERT INTO recommendations
                     (id, user_id, track_id, recommendation_type, score, reason,
                      metadata, is_consumed, consumed_at, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?9)
                 ON CONFLICT (user_id, track_id, recommendation_type) DO UPDATE SET
                     id = excluded.id,
                     score = excluded.score,
                     reason = excluded.reason,
                     metadata = excluded.metadata,
                     is_consumed = 0,
                     consumed_at = NULL,
                     created_at = excluded.created_at,
                     expires_at = excluded.expires_at",
                params![
                    rec.id,
                    rec.user_id,
                    rec.track_id,
                    rec.recommendation_type.label(),
                    rec.score,
                    rec.reason,
                    metadata,
                    rec.created_at.timestamp(),
                    rec.expires_at.timestamp(),
                ],
            )
            .context("Failed to upsert recommendation")?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_active_recommendations(
        &self,
        user_id: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recommendations
             WHERE user_id = ?1 AND expires_at > ?2
             ORDER BY score DESC, track_id ASC",
            RECOMMENDATION_COLUMNS
        ))?;
        let recommendations = stmt
            .query_map(
                params![user_id, now.timestamp()],
                Self::recommendation_from_row,
            )?
            .collect::<Result<_, _>>()?;
        Ok(recommendations)
    }

    fn count_active(&self, user_id: usize, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recommendations WHERE user_id = ?1 AND expires_at > ?2",
            params![user_id, now.timestamp()],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    fn mark_consumed(&self, user_id: usize, track_id: &str, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE recommendations
             SET is_consumed = 1, consumed_at = ?3
             WHERE user_id = ?1 AND track_id = ?2
               AND is_consumed = 0 AND expires_at > ?3",
            params![user_id, track_id, now.timestamp()],
        )?;
        Ok(affected)
    }

    fn get_all_for_user(&self, user_id: usize) -> Result<Vec<Recommendation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recommendations WHERE user_id = ?1 ORDER BY created_at DESC",
            RECOMMENDATION_COLUMNS
        ))?;
        let recommendations = stmt
            .query_map(params![user_id], Self::recommendation_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_store() -> (SqliteRecommendationStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecommendationStore::new(dir.path().join("recommendations.db")).unwrap();
        (store, dir)
    }

    fn recommendation(user_id: usize, track_id: &str, now: DateTime<Utc>) -> Recommendation {
        Recommendation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            track_id: track_id.to_string(),
            recommendation_type: RecommendationType::ContentBased,
            score: 0.8,
            reason: "Similar to tracks you love".to_string(),
            metadata: None,
            is_consumed: false,
            consumed_at: None,
            created_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    #[test]
    fn upsert_supersedes_instead_of_duplicating() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        let mut rec = recommendation(1, "t1", now);
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();
        rec.id = uuid::Uuid::new_v4().to_string();
        rec.score = 0.9;
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();

        let all = store.get_all_for_user(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].score, 0.9);
    }

    #[test]
    fn regeneration_resets_consumption() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        let rec = recommendation(1, "t1", now);
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();
        assert_eq!(store.mark_consumed(1, "t1", now).unwrap(), 1);

        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();
        let all = store.get_all_for_user(1).unwrap();
        assert!(!all[0].is_consumed);
    }

    #[test]
    fn expired_rows_are_filtered_not_deleted() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        let mut rec = recommendation(1, "t1", now - Duration::hours(48));
        rec.expires_at = now - Duration::hours(24);
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();

        assert!(store.get_active_recommendations(1, now).unwrap().is_empty());
        assert_eq!(store.count_active(1, now).unwrap(), 0);
        assert_eq!(store.get_all_for_user(1).unwrap().len(), 1);
    }

    #[test]
    fn mark_consumed_is_idempotent() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        let rec = recommendation(1, "t1", now);
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();

        assert_eq!(store.mark_consumed(1, "t1", now).unwrap(), 1);
        assert_eq!(store.mark_consumed(1, "t1", now).unwrap(), 0);

        let all = store.get_all_for_user(1).unwrap();
        assert!(all[0].is_consumed);
        assert!(all[0].consumed_at.is_some());
    }

    #[test]
    fn mark_consumed_ignores_expired_rows() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        let mut rec = recommendation(1, "t1", now - Duration::hours(48));
        rec.expires_at = now - Duration::hours(24);
        store.upsert_recommendations(std::slice::from_ref(&rec)).unwrap();

        assert_eq!(store.mark_consumed(1, "t1", now).unwrap(), 0);
    }
}
