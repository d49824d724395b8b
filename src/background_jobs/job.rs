use super::context::JobContext;
use std::time::Duration;

/// When a job runs.
#[derive(Debug, Clone)]
pub struct JobSchedule {
    /// Fixed interval between runs; None for startup-only jobs.
    pub interval: Option<Duration>,
    /// Whether to run once when the scheduler starts.
    pub on_startup: bool,
}

impl JobSchedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            on_startup: false,
        }
    }

    pub fn every_with_startup(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            on_startup: true,
        }
    }
}

/// Errors that can occur during job execution.
#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
    Cancelled,
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
            JobError::Cancelled => write!(f, "Job was cancelled"),
        }
    }
}

impl std::error::Error for JobError {}

/// Trait for background jobs.
///
/// `execute` is called from a blocking context via `spawn_blocking`.
/// Long-running jobs should periodically check `ctx.is_cancelled()` and
/// return early with `JobError::Cancelled`.
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// When this job should be scheduled to run.
    fn schedule(&self) -> JobSchedule;

    /// Execute the job.
    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}
