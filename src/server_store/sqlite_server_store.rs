use super::models::{JobRun, JobRunStatus};
use super::schema::SERVER_VERSIONED_SCHEMAS;
use super::ServerStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteServerStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteServerStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn =
            Connection::open(db_path.as_ref()).context("Failed to open server database")?;
        open_versioned(&mut conn, SERVER_VERSIONED_SCHEMAS)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(SqliteServerStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_from_row(row: &rusqlite::Row) -> rusqlite::Result<JobRun> {
        let status_str: String = row.get(4)?;
        Ok(JobRun {
            id: row.get(0)?,
            job_id: row.get(1)?,
            started_at: timestamp_to_datetime(row.get(2)?),
            finished_at: row.get::<_, Option<i64>>(3)?.map(timestamp_to_datetime),
            status: JobRunStatus::parse(&status_str).unwrap_or(JobRunStatus::Failed),
            error_message: row.get(5)?,
            triggered_by: row.get(6)?,
        })
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}

impl ServerStore for SqliteServerStore {
    fn record_job_start(&self, job_id: &str, triggered_by: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO job_run (job_id, status, triggered_by) VALUES (?1, ?2, ?3)",
            params![job_id, JobRunStatus::Running.as_str(), triggered_by],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn record_job_finish(
        &self,
        run_id: i64,
        status: JobRunStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE job_run
             SET finished_at = cast(strftime('%s','now') as int), status = ?2, error_message = ?3
             WHERE id = ?1",
            params![run_id, status.as_str(), error_message],
        )?;
        Ok(())
    }

    fn get_last_run(&self, job_id: &str) -> Result<Option<JobRun>> {
        let conn = self.conn.lock().unwrap();
        let run = conn
            .query_row(
                "SELECT id, job_id, started_at, finished_at, status, error_message, triggered_by
                 FROM job_run WHERE job_id = ?1 ORDER BY id DESC LIMIT 1",
                params![job_id],
                Self::run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn get_job_history(&self, job_id: &str, limit: usize) -> Result<Vec<JobRun>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, job_id, started_at, finished_at, status, error_message, triggered_by
             FROM job_run WHERE job_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let runs = stmt
            .query_map(params![job_id, limit], Self::run_from_row)?
            .collect::<Result<_, _>>()?;
        Ok(runs)
    }

    fn get_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM server_state WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO server_state (key, value, updated)
             VALUES (?1, ?2, cast(strftime('%s','now') as int))
             ON CONFLICT (key) DO UPDATE SET
                 value = excluded.value,
                 updated = excluded.updated",
            params![key, value],
        )?;
        Ok(())
    }
}
