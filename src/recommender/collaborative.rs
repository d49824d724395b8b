//! Collaborative filtering: score candidates by what the user's
//! nearest-neighbor listeners played and loved.

use super::signals::SignalSnapshot;
use super::strategy::{ScoreEntry, StrategyScores};
use crate::config::RecommenderSettings;
use crate::similarity::user_cosine;
use std::collections::{HashMap, HashSet};

/// Weight of a loved track in a user's taste vector, relative to a single
/// completed play.
const LOVED_VECTOR_WEIGHT: f64 = 2.0;

/// Neighbor signal strength for a candidate track.
const PLAYED_SIGNAL: f64 = 1.0;
const LOVED_SIGNAL: f64 = 2.0;

/// Minimum number of shared tracks supporting a genre before it is named in
/// the reason string.
const DOMINANT_GENRE_MIN_TRACKS: usize = 2;

pub fn score(snapshot: &SignalSnapshot, settings: &RecommenderSettings) -> StrategyScores {
    let Some(target_id) = snapshot.user_id else {
        return StrategyScores::new();
    };

    let (vectors, played_sets) = build_user_vectors(snapshot);
    let Some(target_vector) = vectors.get(&target_id) else {
        return StrategyScores::new();
    };

    // k nearest neighbors by cosine similarity; no overlap, no neighbor.
    let mut neighbors: Vec<(usize, f64)> = vectors
        .iter()
        .filter(|(user_id, _)| **user_id != target_id)
        .map(|(user_id, vector)| (*user_id, user_cosine(target_vector, vector)))
        .filter(|(_, sim)| *sim > 0.0)
        .collect();
    neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));
    neighbors.truncate(settings.neighbor_count);

    if neighbors.is_empty() {
        // Cold start: zero coverage, the blend renormalizes without us.
        return StrategyScores::new();
    }

    let loved_sets = loved_by_user(snapshot);
    let empty_played = HashSet::new();
    let empty_loved = HashSet::new();

    let mut raw: HashMap<&str, f64> = HashMap::new();
    for candidate in &snapshot.candidates {
        let mut weight = 0.0;
        for (neighbor_id, sim) in &neighbors {
            let played = played_sets
                .get(neighbor_id)
                .unwrap_or(&empty_played)
                .contains(candidate.id.as_str());
            let loved = loved_sets
                .get(neighbor_id)
                .unwrap_or(&empty_loved)
                .contains(candidate.id.as_str());
            let signal = if loved {
                LOVED_SIGNAL
            } else if played {
                PLAYED_SIGNAL
            } else {
                0.0
            };
            weight += sim * signal;
        }
        if weight > 0.0 {
            raw.insert(&candidate.id, weight);
        }
    }

    let max_weight = raw.values().copied().fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return StrategyScores::new();
    }

    let dominant_genre = dominant_shared_genre(snapshot, &neighbors, &played_sets);

    let mut scores = StrategyScores::new();
    for candidate in &snapshot.candidates {
        let Some(weight) = raw.get(candidate.id.as_str()) else {
            continue;
        };
        let reason = match &dominant_genre {
            Some(genre) if candidate.has_genre(genre) => {
                format!("Matches your preference for {}", genre)
            }
            _ => "Listeners like you enjoyed this".to_string(),
        };
        scores.insert(
            candidate.id.clone(),
            ScoreEntry {
                score: weight / max_weight,
                reason,
            },
        );
    }
    scores
}

/// Sparse taste vectors (track -> weight) and completed-play sets per user,
/// built from the window's events and the loved pairs.
fn build_user_vectors(
    snapshot: &SignalSnapshot,
) -> (
    HashMap<usize, HashMap<String, f64>>,
    HashMap<usize, HashSet<&str>>,
) {
    let mut vectors: HashMap<usize, HashMap<String, f64>> = HashMap::new();
    let mut played_sets: HashMap<usize, HashSet<&str>> = HashMap::new();

    for event in snapshot.all_events.iter().filter(|e| e.counts_as_played()) {
        *vectors
            .entry(event.user_id)
            .or_default()
            .entry(event.track_id.clone())
            .or_insert(0.0) += 1.0;
        played_sets
            .entry(event.user_id)
            .or_default()
            .insert(&event.track_id);
    }

    for (user_id, track_id) in &snapshot.loved_pairs {
        *vectors
            .entry(*user_id)
            .or_default()
            .entry(track_id.clone())
            .or_insert(0.0) += LOVED_VECTOR_WEIGHT;
    }

    // The target user's own events may predate the shared window read cap;
    // make sure their plays are represented.
    if let Some(target_id) = snapshot.user_id {
        for event in snapshot.user_events.iter().filter(|e| e.counts_as_played()) {
            played_sets
                .entry(target_id)
                .or_default()
                .insert(&event.track_id);
            vectors
                .entry(target_id)
                .or_default()
                .entry(event.track_id.clone())
                .or_insert(1.0);
        }
    }

    (vectors, played_sets)
}

fn loved_by_user(snapshot: &SignalSnapshot) -> HashMap<usize, HashSet<&str>> {
    let mut loved: HashMap<usize, HashSet<&str>> = HashMap::new();
    for (user_id, track_id) in &snapshot.loved_pairs {
        loved.entry(*user_id).or_default().insert(track_id.as_str());
    }
    loved
}

/// The genre with the highest summed weight across tracks the target user
/// shares with at least one neighbor, when enough tracks support it.
fn dominant_shared_genre(
    snapshot: &SignalSnapshot,
    neighbors: &[(usize, f64)],
    played_sets: &HashMap<usize, HashSet<&str>>,
) -> Option<String> {
    let target_id = snapshot.user_id?;
    let target_played = played_sets.get(&target_id)?;

    let mut genre_weights: HashMap<&str, (f64, usize)> = HashMap::new();
    for track_id in target_played {
        let shared = neighbors.iter().any(|(neighbor_id, _)| {
            played_sets
                .get(neighbor_id)
                .map(|set| set.contains(track_id))
                .unwrap_or(false)
        });
        if !shared {
            continue;
        }
        if let Some(track) = snapshot.user_tracks.get(*track_id) {
            for genre in &track.genres {
                let entry = genre_weights.entry(genre.genre.as_str()).or_insert((0.0, 0));
                entry.0 += genre.weight;
                entry.1 += 1;
            }
        }
    }

    genre_weights
        .into_iter()
        .filter(|(_, (_, track_count))| *track_count >= DOMINANT_GENRE_MIN_TRACKS)
        .max_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
        .map(|(genre, _)| genre.to_string())
}
