use super::models::{ListeningEvent, Rating, TrackPlayStats, TrackRatingStats};
use anyhow::Result;
use std::collections::HashSet;

pub trait UserStore: Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    /// Returns a user's id given the handle.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    /// Returns a user's handle given the user id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    /// Returns all user ids. Used by batch generation.
    fn get_all_user_ids(&self) -> Result<Vec<usize>>;
}

/// Listening event storage and the aggregate queries the recommender reads.
pub trait UserListeningStore: Send + Sync {
    /// Records a listening event. If session_id already exists, returns Ok
    /// without inserting (idempotent for offline queue retry). Returns the
    /// event id and whether it was created.
    fn record_listening_event(&self, event: ListeningEvent) -> Result<(usize, bool)>;

    /// Gets a user's listening events within a date range, most recent
    /// first, capped at `limit` rows. Both dates are inclusive YYYYMMDD.
    fn get_user_listening_events(
        &self,
        user_id: usize,
        start_date: u32,
        end_date: u32,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>>;

    /// Events of every user within a date range, capped at `limit` rows,
    /// oldest first. Feeds the co-listen index and collaborative filtering.
    fn get_listening_events_in_window(
        &self,
        start_date: u32,
        end_date: u32,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>>;

    /// Per-track play counts within a date range, counting only events that
    /// cross the played-completion threshold. Feeds windowed trending.
    fn get_windowed_track_play_counts(
        &self,
        start_date: u32,
        end_date: u32,
    ) -> Result<Vec<TrackPlayStats>>;

    /// Events with id greater than `after_id`, oldest first, capped at
    /// `limit`. Cursor feed for the consumption watchdog.
    fn get_events_after(&self, after_id: usize, limit: usize) -> Result<Vec<ListeningEvent>>;
}

/// Rating storage: star ratings, loved flags and the ban list.
pub trait UserRatingStore: Send + Sync {
    /// Inserts or overwrites the rating row for (user, track).
    fn upsert_rating(&self, rating: Rating) -> Result<()>;

    /// All rating rows for a user.
    fn get_user_ratings(&self, user_id: usize) -> Result<Vec<Rating>>;

    /// Track ids the user has banned. Callers must exclude these before
    /// scoring, not after.
    fn get_banned_track_ids(&self, user_id: usize) -> Result<HashSet<String>>;

    /// Catalog-wide average rating per track (banned rows excluded from the
    /// average, since a ban is not a quality judgement).
    fn get_track_rating_stats(&self) -> Result<Vec<TrackRatingStats>>;

    /// Every (user_id, track_id) pair with is_loved set. Feeds neighbor
    /// signals for collaborative filtering.
    fn get_loved_pairs(&self) -> Result<Vec<(usize, String)>>;
}

/// Combined trait for user storage with listening and rating tracking.
pub trait FullUserStore: UserStore + UserListeningStore + UserRatingStore {}

impl<T: UserStore + UserListeningStore + UserRatingStore> FullUserStore for T {}
