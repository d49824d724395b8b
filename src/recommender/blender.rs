//! Blender/ranker: merges per-strategy score maps into one deterministic
//! ranked list.
//!
//! Strategies with zero coverage are excluded and the remaining blend
//! weights renormalized, so a cold-start collaborative strategy simply
//! drops out instead of dragging every score toward zero.

use super::strategy::{StrategyKind, StrategyScores, StrategyWeights};
use crate::recommendation_store::RecommendationType;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

/// Minimum share of the final score a strategy must contribute to be named
/// in a hybrid recommendation type.
const HYBRID_CONTRIBUTION_SHARE: f64 = 0.15;

/// One entry of a ranked result list.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTrack {
    pub track_id: String,
    /// Blended score in [0, 1].
    pub score: f64,
    pub reason: String,
    pub recommendation_type: RecommendationType,
}

struct Contribution {
    kind: StrategyKind,
    weighted_score: f64,
    reason: String,
}

/// Blend strategy outputs into a full ranked list. `play_counts` feeds the
/// first tie-break; missing tracks count as zero plays.
pub fn rank(
    outputs: &[(StrategyKind, StrategyScores)],
    weights: &StrategyWeights,
    play_counts: &HashMap<String, u64>,
) -> Vec<RankedTrack> {
    // Coverage: a non-empty score map under a non-zero configured weight.
    let covering: Vec<&(StrategyKind, StrategyScores)> = outputs
        .iter()
        .filter(|output| weights.get(output.0) > 0.0 && !output.1.is_empty())
        .collect();

    let total_weight: f64 = covering.iter().map(|output| weights.get(output.0)).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    let mut contributions: HashMap<&str, Vec<Contribution>> = HashMap::new();
    for output in &covering {
        let kind = output.0;
        let weight = weights.get(kind) / total_weight;
        for (track_id, entry) in output.1.iter() {
            contributions
                .entry(track_id.as_str())
                .or_default()
                .push(Contribution {
                    kind,
                    weighted_score: weight * entry.score,
                    reason: entry.reason.clone(),
                });
        }
    }

    let mut ranked: Vec<RankedTrack> = contributions
        .into_iter()
        .filter_map(|(track_id, mut parts)| {
            // Strategies arrive in completion order; sort before summing so
            // identical requests blend to bit-identical scores.
            parts.sort_by(|a, b| {
                b.weighted_score
                    .total_cmp(&a.weighted_score)
                    .then_with(|| a.kind.key().cmp(b.kind.key()))
            });
            let final_score: f64 = parts.iter().map(|c| c.weighted_score).sum();
            if final_score <= 0.0 {
                return None;
            }

            let reason = parts[0].reason.clone();
            let recommendation_type = blended_type(&parts, final_score);

            Some(RankedTrack {
                track_id: track_id.to_string(),
                score: final_score.clamp(0.0, 1.0),
                reason,
                recommendation_type,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                let plays_a = play_counts.get(&a.track_id).copied().unwrap_or(0);
                let plays_b = play_counts.get(&b.track_id).copied().unwrap_or(0);
                plays_b.cmp(&plays_a)
            })
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    ranked
}

/// The persisted type label: the top strategy's, or a hybrid label naming
/// every strategy contributing at least [`HYBRID_CONTRIBUTION_SHARE`] of
/// the final score, in descending-share order.
fn blended_type(parts: &[Contribution], final_score: f64) -> RecommendationType {
    let contributors: Vec<&Contribution> = parts
        .iter()
        .filter(|c| c.weighted_score / final_score >= HYBRID_CONTRIBUTION_SHARE)
        .collect();

    if contributors.len() >= 2 {
        let label = contributors
            .iter()
            .map(|c| c.kind.key())
            .collect::<Vec<_>>()
            .join("_");
        RecommendationType::Hybrid(format!("hybrid_{}", label))
    } else {
        parts[0].kind.recommendation_type()
    }
}

/// Apply offset then limit to an already-ranked list.
pub fn paginate(ranked: Vec<RankedTrack>, offset: usize, limit: usize) -> Vec<RankedTrack> {
    ranked.into_iter().skip(offset).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::strategy::ScoreEntry;

    fn scores(entries: &[(&str, f64, &str)]) -> StrategyScores {
        entries
            .iter()
            .map(|(id, score, reason)| {
                (
                    id.to_string(),
                    ScoreEntry {
                        score: *score,
                        reason: reason.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn weights_renormalize_over_covering_strategies() {
        // Collaborative has zero coverage; content and popularity split
        // 0.4/0.2 -> 2/3 and 1/3.
        let outputs = vec![
            (StrategyKind::Collaborative, StrategyScores::new()),
            (StrategyKind::ContentBased, scores(&[("t1", 0.9, "similar")])),
            (StrategyKind::Popularity, scores(&[("t1", 0.6, "popular")])),
        ];
        let ranked = rank(&outputs, &StrategyWeights::personalized(), &HashMap::new());

        assert_eq!(ranked.len(), 1);
        let expected = 0.9 * (0.4 / 0.6) + 0.6 * (0.2 / 0.6);
        assert!((ranked[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn hybrid_label_names_contributors_in_share_order() {
        let outputs = vec![
            (StrategyKind::Collaborative, scores(&[("t1", 0.5, "neighbors")])),
            (StrategyKind::ContentBased, scores(&[("t1", 0.9, "similar")])),
        ];
        let weights = StrategyWeights {
            collaborative: 0.5,
            content_based: 0.5,
            popularity: 0.0,
            discovery: 0.0,
        };
        let ranked = rank(&outputs, &weights, &HashMap::new());

        assert_eq!(
            ranked[0].recommendation_type.label(),
            "hybrid_content_based_collaborative"
        );
        // Reason comes from the highest contributor.
        assert_eq!(ranked[0].reason, "similar");
    }

    #[test]
    fn minor_contributor_does_not_trigger_hybrid() {
        let outputs = vec![
            (StrategyKind::ContentBased, scores(&[("t1", 1.0, "similar")])),
            (StrategyKind::Popularity, scores(&[("t1", 0.1, "popular")])),
        ];
        let weights = StrategyWeights {
            collaborative: 0.0,
            content_based: 0.8,
            popularity: 0.2,
            discovery: 0.0,
        };
        let ranked = rank(&outputs, &weights, &HashMap::new());

        // Popularity's share is 0.02/0.82 < 15%.
        assert_eq!(ranked[0].recommendation_type.label(), "content_based");
    }

    #[test]
    fn ties_break_by_play_count_then_track_id() {
        let outputs = vec![(
            StrategyKind::Popularity,
            scores(&[("b", 0.5, "popular"), ("a", 0.5, "popular"), ("c", 0.5, "popular")]),
        )];
        let play_counts =
            HashMap::from([("c".to_string(), 10_u64), ("a".to_string(), 1), ("b".to_string(), 1)]);
        let ranked = rank(&outputs, &StrategyWeights::trending(), &play_counts);

        let order: Vec<&str> = ranked.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn paginate_applies_offset_then_limit() {
        let ranked: Vec<RankedTrack> = (0..5)
            .map(|i| RankedTrack {
                track_id: format!("t{}", i),
                score: 1.0 - i as f64 * 0.1,
                reason: "r".to_string(),
                recommendation_type: RecommendationType::Popularity,
            })
            .collect();

        let page = paginate(ranked, 2, 2);
        let ids: Vec<&str> = page.iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t3"]);
    }
}
