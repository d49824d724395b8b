//! Batch pre-generation of personalized recommendations.
//!
//! Runs on startup and then periodically, generating (and persisting) a
//! fresh recommendation set for every user. Users are independent
//! request-scoped computations, so the fan-out is across users via rayon.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, JobError, JobSchedule},
};
use crate::config::BackgroundJobsSettings;
use crate::recommender::StrategyWeights;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub struct BatchRecommendationsJob {
    interval_hours: u64,
    limit: usize,
}

impl BatchRecommendationsJob {
    pub fn from_settings(settings: &BackgroundJobsSettings) -> Self {
        Self {
            interval_hours: settings.batch_interval_hours,
            limit: settings.batch_limit,
        }
    }
}

impl BackgroundJob for BatchRecommendationsJob {
    fn id(&self) -> &'static str {
        "batch_recommendations"
    }

    fn name(&self) -> &'static str {
        "Batch Recommendations"
    }

    fn description(&self) -> &'static str {
        "Pre-generate personalized recommendations for all users"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::every_with_startup(Duration::from_secs(self.interval_hours * 60 * 60))
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let user_ids = ctx
            .user_store
            .get_all_user_ids()
            .map_err(|e| JobError::ExecutionFailed(format!("Failed to list users: {:#}", e)))?;

        if user_ids.is_empty() {
            info!("No users yet, skipping batch recommendation generation");
            return Ok(());
        }

        let generated = AtomicUsize::new(0);
        let write_failures = AtomicUsize::new(0);
        let weights = StrategyWeights::personalized();

        user_ids.par_iter().for_each(|user_id| {
            if ctx.is_cancelled() {
                return;
            }
            match ctx.engine.generate_blocking(*user_id, &weights, self.limit) {
                Ok(outcome) => {
                    generated.fetch_add(outcome.recommendations.len(), Ordering::Relaxed);
                    if outcome.persist_error.is_some() {
                        write_failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(e) => {
                    warn!("Batch generation failed for user {}: {}", user_id, e);
                }
            }
        });

        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let write_failures = write_failures.load(Ordering::Relaxed);
        info!(
            "Batch generation done: {} recommendations across {} users ({} write failures)",
            generated.load(Ordering::Relaxed),
            user_ids.len(),
            write_failures
        );
        if write_failures > 0 {
            return Err(JobError::ExecutionFailed(format!(
                "{} users had persistence write failures",
                write_failures
            )));
        }
        Ok(())
    }
}
