//! Periodic rebuild of the shared co-listen similarity index.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule},
};
use crate::config::BackgroundJobsSettings;
use std::time::Duration;
use tracing::info;

pub struct ColistenRefreshJob {
    interval_hours: u64,
}

impl ColistenRefreshJob {
    pub fn from_settings(settings: &BackgroundJobsSettings) -> Self {
        Self {
            interval_hours: settings.colisten_interval_hours,
        }
    }
}

impl BackgroundJob for ColistenRefreshJob {
    fn id(&self) -> &'static str {
        "colisten_refresh"
    }

    fn name(&self) -> &'static str {
        "Co-listen Index Refresh"
    }

    fn description(&self) -> &'static str {
        "Rebuild the co-listening similarity index from the current event window"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every_with_startup(Duration::from_secs(self.interval_hours * 60 * 60))
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let pairs = ctx
            .engine
            .rebuild_colisten_index()
            .map_err(|e| JobError::ExecutionFailed(format!("Index rebuild failed: {}", e)))?;
        info!("Co-listen index refreshed: {} track pairs", pairs);
        Ok(())
    }
}
