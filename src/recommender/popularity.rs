//! Popularity scoring: log-dampened play counts blended with average
//! ratings. Runs standalone for the no-user trending feed, where play
//! counts come from the event window instead of the global counters.

use super::signals::SignalSnapshot;
use super::strategy::{ScoreEntry, StrategyScores};

/// Blend weights for the two popularity sources. When one source has no
/// value for a track, its weight is redistributed to the other.
const PLAY_COUNT_WEIGHT: f64 = 0.7;
const RATING_WEIGHT: f64 = 0.3;

pub fn score(snapshot: &SignalSnapshot) -> StrategyScores {
    let max_plays = snapshot
        .candidates
        .iter()
        .map(|t| snapshot.effective_play_count(t))
        .max()
        .unwrap_or(0);

    let reason = if snapshot.windowed_play_counts.is_some() {
        "Trending with listeners right now"
    } else {
        "Popular with listeners"
    };

    let mut scores = StrategyScores::new();
    for candidate in &snapshot.candidates {
        let plays = snapshot.effective_play_count(candidate);
        // Log scaling dampens runaway hits so the rest of the catalog
        // still differentiates.
        let play_score = if plays > 0 && max_plays > 0 {
            Some(((1 + plays) as f64).ln() / ((1 + max_plays) as f64).ln())
        } else {
            None
        };
        let rating_score = snapshot
            .average_rating(&candidate.id)
            .map(|avg| ((avg - 1.0) / 4.0).clamp(0.0, 1.0));

        let composite = composite_score(play_score, rating_score);
        if composite > 0.0 {
            scores.insert(
                candidate.id.clone(),
                ScoreEntry {
                    score: composite,
                    reason: reason.to_string(),
                },
            );
        }
    }
    scores
}

/// Weighted sum over the available sources, weights renormalized over
/// whichever sources actually have a value.
fn composite_score(play_score: Option<f64>, rating_score: Option<f64>) -> f64 {
    let w_plays = if play_score.is_some() {
        PLAY_COUNT_WEIGHT
    } else {
        0.0
    };
    let w_rating = if rating_score.is_some() {
        RATING_WEIGHT
    } else {
        0.0
    };
    let total = w_plays + w_rating;
    if total == 0.0 {
        return 0.0;
    }

    let mut score = 0.0;
    if let Some(s) = play_score {
        score += s * w_plays / total;
    }
    if let Some(s) = rating_score {
        score += s * w_rating / total;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_uses_both_sources() {
        let score = composite_score(Some(1.0), Some(0.5));
        assert!((score - (0.7 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn composite_redistributes_missing_rating() {
        let score = composite_score(Some(0.5), None);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn composite_redistributes_missing_plays() {
        let score = composite_score(None, Some(0.8));
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn composite_empty_when_no_sources() {
        assert_eq!(composite_score(None, None), 0.0);
    }
}
