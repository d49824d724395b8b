//! The recommendation engine facade.
//!
//! Each request loads an immutable signal snapshot, fans the scoring
//! strategies out over blocking tasks, and blends whatever completed within
//! the request budget. Strategy failures and cold-start gaps degrade the
//! blend instead of failing the request.

use super::blender::{self, RankedTrack, DEFAULT_LIMIT, MAX_LIMIT};
use super::error::RecommendError;
use super::playlist::{self, GeneratedPlaylist};
use super::signals::SignalSnapshot;
use super::strategy::{StrategyKind, StrategyScores, StrategyWeights};
use super::{collaborative, content_based, discovery, popularity};
use crate::catalog_store::CatalogStore;
use crate::config::RecommenderSettings;
use crate::recommendation_store::{Recommendation, RecommendationStore};
use crate::similarity::{CoListenCache, CoListenIndex};
use crate::user::FullUserStore;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Upper bound on the playlist candidate pool, whatever the target length.
const PLAYLIST_POOL_CAP: usize = 150;

/// Assumed average track length when sizing the playlist pool.
const EXPECTED_TRACK_SECONDS: u32 = 180;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendRequest {
    pub limit: Option<usize>,
    pub offset: Option<i64>,
    pub genre: Option<String>,
    pub mood: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingPeriod {
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl TrendingPeriod {
    pub fn days(&self) -> u32 {
        match self {
            TrendingPeriod::Last24Hours => 1,
            TrendingPeriod::Last7Days => 7,
            TrendingPeriod::Last30Days => 30,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "last_24_hours" => Some(TrendingPeriod::Last24Hours),
            "last_7_days" => Some(TrendingPeriod::Last7Days),
            "last_30_days" => Some(TrendingPeriod::Last30Days),
            _ => None,
        }
    }
}

/// Result of a persisted generation run. A failed write is retryable and
/// does not invalidate the computed recommendations.
#[derive(Debug)]
pub struct GenerateOutcome {
    pub recommendations: Vec<Recommendation>,
    pub persist_error: Option<String>,
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    users: Arc<dyn FullUserStore>,
    recommendations: Arc<dyn RecommendationStore>,
    colisten: Arc<CoListenCache>,
    settings: RecommenderSettings,
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        users: Arc<dyn FullUserStore>,
        recommendations: Arc<dyn RecommendationStore>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            catalog,
            users,
            recommendations,
            colisten: Arc::new(CoListenCache::empty()),
            settings,
        }
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    /// Rebuild the shared co-listen index from the current event window.
    /// Swaps copy-on-write; in-flight requests keep their old snapshot.
    /// Returns the number of indexed track pairs.
    pub fn rebuild_colisten_index(&self) -> Result<usize, RecommendError> {
        let (start_date, end_date) =
            super::signals::date_window(Utc::now(), self.settings.window_days);
        let events = self.users.get_listening_events_in_window(
            start_date,
            end_date,
            self.settings.window_event_limit,
        )?;
        let index = CoListenIndex::build(&events, self.settings.session_gap_minutes * 60);
        let pairs = index.pair_count();
        self.colisten.replace(index);
        debug!("Rebuilt co-listen index: {} track pairs", pairs);
        Ok(pairs)
    }

    /// Personalized recommendations, ranked and paginated.
    pub async fn get_recommendations(
        &self,
        user_id: usize,
        request: &RecommendRequest,
    ) -> Result<Vec<RankedTrack>, RecommendError> {
        let (limit, offset) = validate_pagination(request.limit, request.offset)?;

        let (mut snapshot, weights) = self.load_personalized(user_id)?;
        apply_tag_filters(&mut snapshot, request.genre.as_deref(), request.mood.as_deref())?;
        if snapshot.candidates.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = Arc::new(snapshot);
        let outputs = self.run_strategies(snapshot.clone(), weights.active_kinds()).await;
        let ranked = blender::rank(&outputs, &weights, &effective_play_counts(&snapshot));
        Ok(blender::paginate(ranked, offset, limit))
    }

    /// Popularity-only feed over a recent event window; no user context.
    pub async fn get_trending(
        &self,
        period: TrendingPeriod,
    ) -> Result<Vec<RankedTrack>, RecommendError> {
        let mut snapshot = SignalSnapshot::load_degraded(
            self.catalog.as_ref(),
            self.users.as_ref(),
            self.colisten.snapshot(),
            &self.settings,
            None,
            Utc::now(),
        )?;
        snapshot.attach_windowed_counts(self.users.as_ref(), Utc::now(), period.days())?;
        if snapshot.candidates.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = Arc::new(snapshot);
        let weights = StrategyWeights::trending();
        let outputs = self.run_strategies(snapshot.clone(), weights.active_kinds()).await;
        let ranked = blender::rank(&outputs, &weights, &effective_play_counts(&snapshot));
        Ok(blender::paginate(ranked, 0, DEFAULT_LIMIT))
    }

    /// Hidden-gems feed: high rating, low play count.
    pub async fn get_discovery(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<RankedTrack>, RecommendError> {
        let (limit, _) = validate_pagination(limit, None)?;

        let snapshot = SignalSnapshot::load_degraded(
            self.catalog.as_ref(),
            self.users.as_ref(),
            self.colisten.snapshot(),
            &self.settings,
            None,
            Utc::now(),
        )?;
        if snapshot.candidates.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = Arc::new(snapshot);
        let weights = StrategyWeights::discovery();
        let outputs = self.run_strategies(snapshot.clone(), weights.active_kinds()).await;
        let ranked = blender::rank(&outputs, &weights, &effective_play_counts(&snapshot));
        Ok(blender::paginate(ranked, 0, limit))
    }

    /// Assemble a smart playlist against a duration budget.
    pub async fn generate_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: &str,
        duration_minutes: u32,
        genre: Option<&str>,
        mood: Option<&str>,
    ) -> Result<GeneratedPlaylist, RecommendError> {
        if duration_minutes == 0 {
            return Err(RecommendError::InvalidParameter(
                "duration_minutes must be greater than zero".to_string(),
            ));
        }
        let target_seconds = duration_minutes * 60;

        let (mut snapshot, weights) = self.load_personalized(user_id)?;
        apply_tag_filters(&mut snapshot, genre, mood)?;
        if snapshot.candidates.is_empty() {
            return Ok(GeneratedPlaylist {
                name: name.to_string(),
                description: description.to_string(),
                tracks: Vec::new(),
                total_duration_seconds: 0,
            });
        }

        let durations: HashMap<String, u32> = snapshot
            .candidates
            .iter()
            .map(|t| (t.id.clone(), t.duration_seconds))
            .collect();

        // Oversize the pool relative to the expected track count so the
        // greedy pass has room to skip ill-fitting durations.
        let expected_tracks = target_seconds.div_ceil(EXPECTED_TRACK_SECONDS) as usize;
        let pool_size = (expected_tracks * 3).min(PLAYLIST_POOL_CAP);

        let snapshot = Arc::new(snapshot);
        let outputs = self.run_strategies(snapshot.clone(), weights.active_kinds()).await;
        let ranked = blender::rank(&outputs, &weights, &effective_play_counts(&snapshot));
        let pool = blender::paginate(ranked, 0, pool_size);

        let (tracks, total_duration_seconds) = playlist::assemble(
            pool,
            &durations,
            target_seconds,
            self.settings.playlist_overshoot_tolerance,
        );

        info!(
            "Generated playlist '{}' for user {}: {} tracks, {}s of {}s requested",
            name,
            user_id,
            tracks.len(),
            total_duration_seconds,
            target_seconds
        );

        Ok(GeneratedPlaylist {
            name: name.to_string(),
            description: description.to_string(),
            tracks,
            total_duration_seconds,
        })
    }

    /// Compute and persist recommendations with a TTL. The computed rows
    /// are returned even when the write fails; the failure is reported in
    /// the outcome as retryable.
    pub async fn generate(
        &self,
        user_id: usize,
        weights: &StrategyWeights,
        limit: usize,
    ) -> Result<GenerateOutcome, RecommendError> {
        let (limit, _) = validate_pagination(Some(limit), None)?;

        let (snapshot, _) = self.load_personalized(user_id)?;
        if snapshot.candidates.is_empty() {
            return Ok(GenerateOutcome {
                recommendations: Vec::new(),
                persist_error: None,
            });
        }
        let snapshot = Arc::new(snapshot);
        let outputs = self.run_strategies(snapshot.clone(), weights.active_kinds()).await;
        let ranked = blender::rank(&outputs, weights, &effective_play_counts(&snapshot));
        let ranked = blender::paginate(ranked, 0, limit);

        Ok(self.persist_ranked(user_id, weights, ranked))
    }

    /// Synchronous generation path for batch jobs, which parallelize across
    /// users instead of across strategies.
    pub fn generate_blocking(
        &self,
        user_id: usize,
        weights: &StrategyWeights,
        limit: usize,
    ) -> Result<GenerateOutcome, RecommendError> {
        let (limit, _) = validate_pagination(Some(limit), None)?;

        let (snapshot, _) = self.load_personalized(user_id)?;
        if snapshot.candidates.is_empty() {
            return Ok(GenerateOutcome {
                recommendations: Vec::new(),
                persist_error: None,
            });
        }

        let outputs = score_strategies_sync(&snapshot, &self.settings, &weights.active_kinds());
        let ranked = blender::rank(&outputs, weights, &effective_play_counts(&snapshot));
        let ranked = blender::paginate(ranked, 0, limit);

        Ok(self.persist_ranked(user_id, weights, ranked))
    }

    /// Flip consumption on matching active recommendations. Idempotent.
    pub fn mark_consumed(&self, user_id: usize, track_id: &str) -> Result<usize, RecommendError> {
        let affected = self
            .recommendations
            .mark_consumed(user_id, track_id, Utc::now())?;
        if affected > 0 {
            debug!(
                "Marked {} recommendation(s) consumed for user {} track {}",
                affected, user_id, track_id
            );
        }
        Ok(affected)
    }

    fn persist_ranked(
        &self,
        user_id: usize,
        weights: &StrategyWeights,
        ranked: Vec<RankedTrack>,
    ) -> GenerateOutcome {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.settings.recommendation_ttl_hours);
        let metadata = serde_json::json!({
            "strategy_mix": {
                "collaborative": weights.collaborative,
                "content_based": weights.content_based,
                "popularity": weights.popularity,
                "discovery": weights.discovery,
            },
        });

        let rows: Vec<Recommendation> = ranked
            .into_iter()
            .map(|entry| Recommendation {
                id: Uuid::new_v4().to_string(),
                user_id,
                track_id: entry.track_id,
                recommendation_type: entry.recommendation_type,
                score: entry.score,
                reason: entry.reason,
                metadata: Some(metadata.clone()),
                is_consumed: false,
                consumed_at: None,
                created_at: now,
                expires_at,
            })
            .collect();

        let persist_error = match self.recommendations.upsert_recommendations(&rows) {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Failed to persist {} recommendations for user {}: {:#}",
                    rows.len(),
                    user_id,
                    e
                );
                Some(format!("{:#}", e))
            }
        };

        GenerateOutcome {
            recommendations: rows,
            persist_error,
        }
    }

    /// Load the personalized snapshot, degrading to popularity-only signals
    /// when the user has no listening history.
    fn load_personalized(
        &self,
        user_id: usize,
    ) -> Result<(SignalSnapshot, StrategyWeights), RecommendError> {
        match SignalSnapshot::load_for_user(
            self.catalog.as_ref(),
            self.users.as_ref(),
            self.colisten.snapshot(),
            &self.settings,
            user_id,
            Utc::now(),
        ) {
            Ok(snapshot) => Ok((snapshot, StrategyWeights::personalized())),
            Err(RecommendError::SignalUnavailable(_)) => {
                info!(
                    "User {} has no listening history, degrading to popularity fallback",
                    user_id
                );
                let snapshot = SignalSnapshot::load_degraded(
                    self.catalog.as_ref(),
                    self.users.as_ref(),
                    self.colisten.snapshot(),
                    &self.settings,
                    Some(user_id),
                    Utc::now(),
                )?;
                Ok((snapshot, StrategyWeights::personalized()))
            }
            Err(e) => Err(e),
        }
    }

    /// Fan strategies out over blocking tasks and collect until all finish
    /// or the request budget elapses. Late strategies are dropped from the
    /// blend; a panicking strategy is logged and contributes zero coverage.
    async fn run_strategies(
        &self,
        snapshot: Arc<SignalSnapshot>,
        kinds: Vec<StrategyKind>,
    ) -> Vec<(StrategyKind, StrategyScores)> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(kinds.len().max(1));
        for kind in &kinds {
            let kind = *kind;
            let snapshot = snapshot.clone();
            let settings = self.settings.clone();
            let tx = tx.clone();
            tokio::task::spawn_blocking(move || {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    score_strategy(kind, &snapshot, &settings)
                }));
                let _ = tx.blocking_send((kind, result));
            });
        }
        drop(tx);

        let deadline = tokio::time::Instant::now()
            + std::time::Duration::from_millis(self.settings.request_budget_ms);

        let mut outputs = Vec::with_capacity(kinds.len());
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some((kind, Ok(scores)))) => outputs.push((kind, scores)),
                Ok(Some((kind, Err(_)))) => {
                    warn!("Strategy {} panicked, excluding it from the blend", kind.key());
                }
                Ok(None) => break,
                Err(_) => {
                    let missing: Vec<&str> = kinds
                        .iter()
                        .filter(|k| !outputs.iter().any(|(done, _)| done == *k))
                        .map(|k| k.key())
                        .collect();
                    warn!(
                        "Request budget of {}ms exceeded, blending partial results without [{}]",
                        self.settings.request_budget_ms,
                        missing.join(", ")
                    );
                    break;
                }
            }
        }
        outputs
    }
}

fn score_strategy(
    kind: StrategyKind,
    snapshot: &SignalSnapshot,
    settings: &RecommenderSettings,
) -> StrategyScores {
    match kind {
        StrategyKind::Collaborative => collaborative::score(snapshot, settings),
        StrategyKind::ContentBased => content_based::score(snapshot, settings),
        StrategyKind::Popularity => popularity::score(snapshot),
        StrategyKind::Discovery => discovery::score(snapshot, settings),
    }
}

fn score_strategies_sync(
    snapshot: &SignalSnapshot,
    settings: &RecommenderSettings,
    kinds: &[StrategyKind],
) -> Vec<(StrategyKind, StrategyScores)> {
    kinds
        .iter()
        .filter_map(|kind| {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                score_strategy(*kind, snapshot, settings)
            }));
            match result {
                Ok(scores) => Some((*kind, scores)),
                Err(_) => {
                    warn!("Strategy {} panicked, excluding it from the blend", kind.key());
                    None
                }
            }
        })
        .collect()
}

fn effective_play_counts(snapshot: &SignalSnapshot) -> HashMap<String, u64> {
    snapshot
        .candidates
        .iter()
        .map(|t| (t.id.clone(), snapshot.effective_play_count(t)))
        .collect()
}

fn validate_pagination(
    limit: Option<usize>,
    offset: Option<i64>,
) -> Result<(usize, usize), RecommendError> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(RecommendError::InvalidParameter(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(RecommendError::InvalidParameter(format!(
            "offset must not be negative, got {}",
            offset
        )));
    }
    Ok((limit, offset as usize))
}

/// Genre and mood both filter on weighted tags. A tag no candidate carries
/// is rejected as unknown rather than silently returning nothing.
fn apply_tag_filters(
    snapshot: &mut SignalSnapshot,
    genre: Option<&str>,
    mood: Option<&str>,
) -> Result<(), RecommendError> {
    for (label, tag) in [("genre", genre), ("mood", mood)] {
        let Some(tag) = tag else { continue };
        if !snapshot.candidates.iter().any(|t| t.has_genre(tag)) {
            return Err(RecommendError::InvalidParameter(format!(
                "unknown {} filter: {}",
                label, tag
            )));
        }
        snapshot.candidates.retain(|t| t.has_genre(tag));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(validate_pagination(None, None).unwrap(), (DEFAULT_LIMIT, 0));
        assert_eq!(validate_pagination(Some(50), Some(10)).unwrap(), (50, 10));
        assert!(validate_pagination(Some(51), None).is_err());
        assert!(validate_pagination(Some(0), None).is_err());
        assert!(validate_pagination(None, Some(-1)).is_err());
    }

    #[test]
    fn trending_period_parse() {
        assert_eq!(
            TrendingPeriod::parse("last_7_days"),
            Some(TrendingPeriod::Last7Days)
        );
        assert_eq!(TrendingPeriod::parse("fortnight"), None);
        assert_eq!(TrendingPeriod::Last24Hours.days(), 1);
    }
}
