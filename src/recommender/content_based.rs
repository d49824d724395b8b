//! Content-based filtering: score candidates by similarity to the tracks
//! the user plays and loves, with a boost through artist relationships.

use super::signals::SignalSnapshot;
use super::strategy::{ScoreEntry, StrategyScores};
use crate::catalog_store::Track;
use crate::config::RecommenderSettings;
use crate::similarity::TrackSimilarity;
use std::collections::HashMap;

/// Seed weight bonus for loved tracks, on top of their play count.
const LOVED_SEED_BONUS: f64 = 3.0;

pub fn score(snapshot: &SignalSnapshot, settings: &RecommenderSettings) -> StrategyScores {
    if snapshot.user_id.is_none() {
        return StrategyScores::new();
    }

    let seeds = seed_tracks(snapshot, settings.content_seed_count);
    if seeds.is_empty() {
        return StrategyScores::new();
    }
    let total_seed_weight: f64 = seeds.iter().map(|(_, w)| w).sum();

    // Directed expansion: only edges leaving a favored artist count.
    let mut related_artists: HashMap<&str, f64> = HashMap::new();
    for relation in &snapshot.artist_relations {
        let strength = related_artists
            .entry(relation.related_artist_id.as_str())
            .or_insert(0.0);
        *strength = strength.max(relation.strength);
    }

    let mut similarity = TrackSimilarity::new(snapshot.colisten.clone());
    let mut scores = StrategyScores::new();

    for candidate in &snapshot.candidates {
        let mut weighted_sim = 0.0;
        let mut best_seed: Option<(&Track, f64)> = None;
        for &(seed, weight) in &seeds {
            let sim = similarity.similarity(candidate, seed);
            weighted_sim += weight * sim;
            if best_seed.map(|(_, s)| sim > s).unwrap_or(true) {
                best_seed = Some((seed, sim));
            }
        }
        let base = weighted_sim / total_seed_weight;

        let boost = related_artists
            .get(candidate.artist_id.as_str())
            .map(|strength| settings.artist_relation_boost * strength)
            .unwrap_or(0.0);

        let score = (base + boost).clamp(0.0, 1.0);
        if score <= 0.0 {
            continue;
        }

        let reason = if boost > base {
            "From an artist related to ones you listen to".to_string()
        } else {
            match best_seed.and_then(|(seed, _)| shared_genre(candidate, seed)) {
                Some(genre) => format!("Similar to {} tracks you love", genre),
                None => "Similar to tracks you listen to".to_string(),
            }
        };

        scores.insert(candidate.id.clone(), ScoreEntry { score, reason });
    }
    scores
}

/// The user's top tracks by play count and love, with catalog detail.
fn seed_tracks(snapshot: &SignalSnapshot, seed_count: usize) -> Vec<(&Track, f64)> {
    let play_counts = snapshot.user_play_counts();
    let loved = snapshot.user_loved_track_ids();

    let mut seeds: Vec<(&Track, f64)> = snapshot
        .user_tracks
        .values()
        .map(|track| {
            let plays = play_counts.get(track.id.as_str()).copied().unwrap_or(0) as f64;
            let bonus = if loved.contains(track.id.as_str()) {
                LOVED_SEED_BONUS
            } else {
                0.0
            };
            (track, plays + bonus)
        })
        .filter(|(_, weight)| *weight > 0.0)
        .collect();

    seeds.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    seeds.truncate(seed_count);
    seeds
}

/// The strongest genre both tracks carry, by weight product.
fn shared_genre(a: &Track, b: &Track) -> Option<String> {
    a.genres
        .iter()
        .filter_map(|genre| {
            let other = b.genre_weight(&genre.genre);
            if other > 0.0 {
                Some((genre.genre.clone(), genre.weight * other))
            } else {
                None
            }
        })
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(genre, _)| genre)
}
