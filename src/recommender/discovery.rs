//! Hidden-gems discovery: a qualifying filter (high rating, low play
//! count) followed by rating-based scoring. Tracks failing either
//! threshold are excluded entirely, never down-scored.

use super::signals::SignalSnapshot;
use super::strategy::{ScoreEntry, StrategyScores};
use crate::config::RecommenderSettings;

pub const HIDDEN_GEM_REASON: &str = "Hidden gem - high quality, underplayed track";

pub fn score(snapshot: &SignalSnapshot, settings: &RecommenderSettings) -> StrategyScores {
    let play_count_cutoff = snapshot.bottom_quartile_play_count;

    let mut scores = StrategyScores::new();
    for candidate in &snapshot.candidates {
        let Some(stats) = snapshot.rating_stats.get(&candidate.id) else {
            continue;
        };
        if stats.average_rating < settings.discovery_min_rating {
            continue;
        }
        if candidate.play_count > play_count_cutoff {
            continue;
        }

        scores.insert(
            candidate.id.clone(),
            ScoreEntry {
                score: ((stats.average_rating - 1.0) / 4.0).clamp(0.0, 1.0),
                reason: HIDDEN_GEM_REASON.to_string(),
            },
        );
    }
    scores
}
