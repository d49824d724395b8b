//! A compact interval scheduler for background jobs.
//!
//! Each registered job gets its own tokio task: run on startup when the
//! schedule asks for it, then tick at the configured interval until the
//! cancellation token fires. Job bodies run via `spawn_blocking` and every
//! run is recorded in the server store.

use super::context::JobContext;
use super::job::{BackgroundJob, JobError};
use crate::server_store::JobRunStatus;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct JobScheduler {
    ctx: JobContext,
    jobs: Vec<Arc<dyn BackgroundJob>>,
}

/// Handle to the running scheduler tasks; await it after cancelling the
/// shared token to drain in-flight runs.
pub struct SchedulerHandle {
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn shutdown(self) {
        join_all(self.handles).await;
    }
}

impl JobScheduler {
    pub fn new(ctx: JobContext) -> Self {
        Self {
            ctx,
            jobs: Vec::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn BackgroundJob>) {
        self.jobs.push(job);
    }

    pub fn job_ids(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.id()).collect()
    }

    /// Spawn one task per job and return a handle for shutdown draining.
    pub fn start(self) -> SchedulerHandle {
        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            let ctx = self.ctx.clone();
            handles.push(tokio::spawn(run_job_loop(job, ctx)));
        }
        SchedulerHandle { handles }
    }
}

async fn run_job_loop(job: Arc<dyn BackgroundJob>, ctx: JobContext) {
    let schedule = job.schedule();

    if schedule.on_startup {
        run_job_once(&job, &ctx, "hook:OnStartup").await;
    }

    let Some(interval) = schedule.interval else {
        return;
    };
    let mut ticker = tokio::time::interval(interval);
    // The immediate first tick would duplicate the startup run.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ctx.cancellation_token.cancelled() => {
                info!("Scheduler stopping job '{}'", job.id());
                return;
            }
            _ = ticker.tick() => {
                run_job_once(&job, &ctx, "schedule").await;
            }
        }
    }
}

async fn run_job_once(job: &Arc<dyn BackgroundJob>, ctx: &JobContext, triggered_by: &str) {
    let job_id = job.id();
    let run_id = match ctx.server_store.record_job_start(job_id, triggered_by) {
        Ok(id) => Some(id),
        Err(e) => {
            error!("Failed to record start of job '{}': {:#}", job_id, e);
            None
        }
    };

    let task_job = job.clone();
    let job_ctx = ctx.clone();
    let started = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || task_job.execute(&job_ctx)).await;

    let (status, error_message) = match result {
        Ok(Ok(())) => {
            info!(
                "Job '{}' completed in {}ms",
                job_id,
                started.elapsed().as_millis()
            );
            (JobRunStatus::Completed, None)
        }
        Ok(Err(JobError::Cancelled)) => {
            warn!("Job '{}' cancelled during shutdown", job_id);
            (JobRunStatus::Failed, Some(JobError::Cancelled.to_string()))
        }
        Ok(Err(e)) => {
            error!("Job '{}' failed: {}", job_id, e);
            (JobRunStatus::Failed, Some(e.to_string()))
        }
        Err(join_error) => {
            error!("Job '{}' panicked: {}", job_id, join_error);
            (JobRunStatus::Failed, Some(join_error.to_string()))
        }
    };

    if let Some(run_id) = run_id {
        if let Err(e) = ctx
            .server_store
            .record_job_finish(run_id, status, error_message)
        {
            error!("Failed to record finish of job run {}: {:#}", run_id, e);
        }
    }
}
