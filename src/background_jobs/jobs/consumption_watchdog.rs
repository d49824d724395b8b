//! Consumption watchdog.
//!
//! Scans listening events past a persisted cursor and marks matching
//! active recommendations as consumed. The cursor lives in the server
//! store so restarts pick up exactly where the last run stopped.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule},
};
use crate::config::BackgroundJobsSettings;
use std::time::Duration;
use tracing::{debug, info};

const CURSOR_STATE_KEY: &str = "consumption_watchdog_cursor";

pub struct ConsumptionWatchdogJob {
    interval_minutes: u64,
    batch_size: usize,
}

impl ConsumptionWatchdogJob {
    pub fn from_settings(settings: &BackgroundJobsSettings) -> Self {
        Self {
            interval_minutes: settings.consumption_interval_minutes,
            batch_size: settings.consumption_batch_size,
        }
    }
}

impl BackgroundJob for ConsumptionWatchdogJob {
    fn id(&self) -> &'static str {
        "consumption_watchdog"
    }

    fn name(&self) -> &'static str {
        "Consumption Watchdog"
    }

    fn description(&self) -> &'static str {
        "Mark recommendations consumed when their track shows up in new listening events"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every(Duration::from_secs(self.interval_minutes * 60))
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let cursor: usize = ctx
            .server_store
            .get_state(CURSOR_STATE_KEY)
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to read cursor: {:#}", e)))?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let events = ctx
            .user_store
            .get_events_after(cursor, self.batch_size)
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to read events: {:#}", e)))?;

        if events.is_empty() {
            debug!("No new listening events past cursor {}", cursor);
            return Ok(());
        }

        let mut consumed = 0;
        let mut last_id = cursor;
        for event in &events {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            if event.counts_as_played() {
                consumed += ctx
                    .engine
                    .mark_consumed(event.user_id, &event.track_id)
                    .map_err(|e| {
                        JobError::ExecutionFailed(format!("Failed to mark consumed: {}", e))
                    })?;
            }
            if let Some(id) = event.id {
                last_id = last_id.max(id);
            }
        }

        ctx.server_store
            .set_state(CURSOR_STATE_KEY, &last_id.to_string())
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to store cursor: {:#}", e)))?;

        info!(
            "Consumption watchdog processed {} events, consumed {} recommendations, cursor at {}",
            events.len(),
            consumed,
            last_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_metadata() {
        let job = ConsumptionWatchdogJob::from_settings(&BackgroundJobsSettings::default());

        assert_eq!(job.id(), "consumption_watchdog");
        let schedule = job.schedule();
        assert!(!schedule.on_startup);
        assert_eq!(schedule.interval, Some(Duration::from_secs(5 * 60)));
    }
}
