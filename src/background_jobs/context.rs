use crate::config::BackgroundJobsSettings;
use crate::recommendation_store::RecommendationStore;
use crate::recommender::RecommendationEngine;
use crate::server_store::ServerStore;
use crate::user::FullUserStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// The engine, for generation and index rebuilds.
    pub engine: Arc<RecommendationEngine>,

    /// Access to users, listening events and ratings.
    pub user_store: Arc<dyn FullUserStore>,

    /// Access to persisted recommendation rows.
    pub recommendation_store: Arc<dyn RecommendationStore>,

    /// Access to server-side state (job history, watchdog cursor).
    pub server_store: Arc<dyn ServerStore>,

    pub settings: BackgroundJobsSettings,
}

impl JobContext {
    /// Check if cancellation has been requested. Jobs should poll this
    /// during long-running work and bail with `JobError::Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
