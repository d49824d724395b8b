//! Signal snapshot: the read-only inputs one request scores against.
//!
//! Loaded once per request from the stores, then shared immutably with the
//! strategy tasks. All reads are window- and row-bounded so one user with
//! unbounded history cannot stall a request.

use super::error::RecommendError;
use crate::catalog_store::{ArtistRelationship, CatalogStore, Track};
use crate::config::RecommenderSettings;
use crate::similarity::CoListenIndex;
use crate::user::{FullUserStore, ListeningEvent, Rating, TrackRatingStats};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Cap on how many of the user's tracks get full catalog detail loaded
/// (content-based seeds and artist-relationship expansion).
const USER_TRACK_DETAIL_CAP: usize = 200;

/// Inclusive YYYYMMDD date range ending at `now`.
pub fn date_window(now: DateTime<Utc>, window_days: u32) -> (u32, u32) {
    let start = now - Duration::days(window_days as i64);
    let start_date = start.format("%Y%m%d").to_string().parse().unwrap_or(0);
    let end_date = now.format("%Y%m%d").to_string().parse().unwrap_or(u32::MAX);
    (start_date, end_date)
}

pub struct SignalSnapshot {
    pub user_id: Option<usize>,
    pub start_date: u32,
    pub end_date: u32,
    /// Target user's events in the window, most recent first.
    pub user_events: Vec<ListeningEvent>,
    pub user_ratings: Vec<Rating>,
    /// Catalog detail for tracks the user played or loved.
    pub user_tracks: HashMap<String, Track>,
    /// All users' events in the window (bounded), oldest first.
    pub all_events: Vec<ListeningEvent>,
    /// Every (user, track) loved pair.
    pub loved_pairs: Vec<(usize, String)>,
    /// Catalog-wide rating aggregates by track.
    pub rating_stats: HashMap<String, TrackRatingStats>,
    /// Candidate tracks: banned excluded, and for users with history their
    /// already-played tracks excluded too.
    pub candidates: Vec<Track>,
    /// Windowed play counts replacing global counters for trending requests.
    pub windowed_play_counts: Option<HashMap<String, u64>>,
    /// Outgoing relationship edges of the artists behind `user_tracks`.
    pub artist_relations: Vec<ArtistRelationship>,
    /// Play-count cutoff below which a track counts as underplayed.
    pub bottom_quartile_play_count: u64,
    pub colisten: Arc<CoListenIndex>,
}

impl SignalSnapshot {
    /// Load signals for a personalized request. Fails with
    /// `SignalUnavailable` when the user has no listening history in the
    /// window; callers degrade to [`load_degraded`] rather than erroring
    /// the whole request.
    pub fn load_for_user(
        catalog: &dyn CatalogStore,
        users: &dyn FullUserStore,
        colisten: Arc<CoListenIndex>,
        settings: &RecommenderSettings,
        user_id: usize,
        now: DateTime<Utc>,
    ) -> Result<SignalSnapshot, RecommendError> {
        let (start_date, end_date) = date_window(now, settings.window_days);

        let user_events = users.get_user_listening_events(
            user_id,
            start_date,
            end_date,
            settings.max_events_per_request,
        )?;
        if user_events.is_empty() {
            return Err(RecommendError::SignalUnavailable(user_id));
        }

        let user_ratings = users.get_user_ratings(user_id)?;
        let banned = users.get_banned_track_ids(user_id)?;
        let played: HashSet<&str> = user_events.iter().map(|e| e.track_id.as_str()).collect();

        let candidates = catalog
            .list_tracks(settings.candidate_pool_limit)?
            .into_iter()
            .filter(|t| !banned.contains(&t.id) && !played.contains(t.id.as_str()))
            .collect();

        // Full detail for the user's own tracks: content-based seeds and
        // the artists to expand relationships from.
        let mut detail_ids: Vec<&str> = Vec::new();
        let mut seen = HashSet::new();
        for event in &user_events {
            if seen.insert(event.track_id.as_str()) {
                detail_ids.push(&event.track_id);
            }
        }
        for rating in user_ratings.iter().filter(|r| r.is_loved) {
            if seen.insert(rating.track_id.as_str()) {
                detail_ids.push(&rating.track_id);
            }
        }
        detail_ids.truncate(USER_TRACK_DETAIL_CAP);

        let mut user_tracks = HashMap::new();
        for track_id in detail_ids {
            if let Some(track) = catalog.get_track(track_id)? {
                user_tracks.insert(track_id.to_string(), track);
            }
        }

        let mut artist_relations = Vec::new();
        let artist_ids: HashSet<&str> = user_tracks.values().map(|t| t.artist_id.as_str()).collect();
        for artist_id in artist_ids {
            artist_relations.extend(catalog.get_artist_relationships(artist_id)?);
        }

        let mut snapshot = Self::load_shared(
            catalog,
            users,
            colisten,
            settings,
            start_date,
            end_date,
        )?;
        snapshot.user_id = Some(user_id);
        snapshot.user_events = user_events;
        snapshot.user_ratings = user_ratings;
        snapshot.user_tracks = user_tracks;
        snapshot.candidates = candidates;
        snapshot.artist_relations = artist_relations;
        Ok(snapshot)
    }

    /// Load signals without per-user history: the trending/discovery feeds
    /// and the popularity-only fallback for cold-start users. Banned tracks
    /// are still excluded when a user is given.
    pub fn load_degraded(
        catalog: &dyn CatalogStore,
        users: &dyn FullUserStore,
        colisten: Arc<CoListenIndex>,
        settings: &RecommenderSettings,
        user_id: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<SignalSnapshot, RecommendError> {
        let (start_date, end_date) = date_window(now, settings.window_days);

        let banned = match user_id {
            Some(user_id) => users.get_banned_track_ids(user_id)?,
            None => HashSet::new(),
        };
        let user_ratings = match user_id {
            Some(user_id) => users.get_user_ratings(user_id)?,
            None => Vec::new(),
        };

        let candidates = catalog
            .list_tracks(settings.candidate_pool_limit)?
            .into_iter()
            .filter(|t| !banned.contains(&t.id))
            .collect();

        let mut snapshot = Self::load_shared(
            catalog,
            users,
            colisten,
            settings,
            start_date,
            end_date,
        )?;
        snapshot.user_id = user_id;
        snapshot.user_ratings = user_ratings;
        snapshot.candidates = candidates;
        Ok(snapshot)
    }

    fn load_shared(
        catalog: &dyn CatalogStore,
        users: &dyn FullUserStore,
        colisten: Arc<CoListenIndex>,
        settings: &RecommenderSettings,
        start_date: u32,
        end_date: u32,
    ) -> Result<SignalSnapshot, RecommendError> {
        let all_events =
            users.get_listening_events_in_window(start_date, end_date, settings.window_event_limit)?;
        let loved_pairs = users.get_loved_pairs()?;
        let rating_stats = users
            .get_track_rating_stats()?
            .into_iter()
            .map(|s| (s.track_id.clone(), s))
            .collect();
        let bottom_quartile_play_count = catalog.bottom_quartile_play_count()?;

        Ok(SignalSnapshot {
            user_id: None,
            start_date,
            end_date,
            user_events: Vec::new(),
            user_ratings: Vec::new(),
            user_tracks: HashMap::new(),
            all_events,
            loved_pairs,
            rating_stats,
            candidates: Vec::new(),
            windowed_play_counts: None,
            artist_relations: Vec::new(),
            bottom_quartile_play_count,
            colisten,
        })
    }

    /// Replace global play counters with event counts from a trending
    /// window.
    pub fn attach_windowed_counts(
        &mut self,
        users: &dyn FullUserStore,
        now: DateTime<Utc>,
        period_days: u32,
    ) -> Result<(), RecommendError> {
        let (start_date, end_date) = date_window(now, period_days);
        let counts = users
            .get_windowed_track_play_counts(start_date, end_date)?
            .into_iter()
            .map(|s| (s.track_id, s.play_count))
            .collect();
        self.windowed_play_counts = Some(counts);
        Ok(())
    }

    /// The play count popularity scoring should use for a track.
    pub fn effective_play_count(&self, track: &Track) -> u64 {
        match &self.windowed_play_counts {
            Some(counts) => counts.get(&track.id).copied().unwrap_or(0),
            None => track.play_count,
        }
    }

    pub fn average_rating(&self, track_id: &str) -> Option<f64> {
        self.rating_stats.get(track_id).map(|s| s.average_rating)
    }

    /// Target user's completed-play counts per track.
    pub fn user_play_counts(&self) -> HashMap<&str, u32> {
        let mut counts = HashMap::new();
        for event in self.user_events.iter().filter(|e| e.counts_as_played()) {
            *counts.entry(event.track_id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Track ids the target user loves.
    pub fn user_loved_track_ids(&self) -> HashSet<&str> {
        self.user_ratings
            .iter()
            .filter(|r| r.is_loved)
            .map(|r| r.track_id.as_str())
            .collect()
    }
}
