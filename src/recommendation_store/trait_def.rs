//! RecommendationStore trait definition.

use super::models::Recommendation;
use anyhow::Result;
use chrono::{DateTime, Utc};

pub trait RecommendationStore: Send + Sync {
    /// Write a batch of recommendations. An existing row for the same
    /// (user, track, type) tuple is superseded in place, never duplicated.
    fn upsert_recommendations(&self, recommendations: &[Recommendation]) -> Result<()>;

    /// Active (non-expired) recommendations for a user, highest score first.
    fn get_active_recommendations(
        &self,
        user_id: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>>;

    /// Number of active recommendations for a user.
    fn count_active(&self, user_id: usize, now: DateTime<Utc>) -> Result<usize>;

    /// Flip is_consumed on every active, not-yet-consumed recommendation of
    /// this user for the track. Returns the number of rows affected; zero
    /// when there was nothing to consume (already consumed or expired),
    /// which is not an error.
    fn mark_consumed(&self, user_id: usize, track_id: &str, now: DateTime<Utc>) -> Result<usize>;

    /// Every stored row for a user, expired and consumed included. Used by
    /// admin introspection and tests.
    fn get_all_for_user(&self, user_id: usize) -> Result<Vec<Recommendation>>;
}
