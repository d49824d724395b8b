//! Track-track and user-user similarity.
//!
//! Track similarity blends genre-vector overlap with co-listening frequency.
//! The co-listen index is expensive to build (one pass over the event
//! window), so it is shared across requests behind a copy-on-write handle;
//! pair similarities themselves are cheap and memoized per request.

use crate::catalog_store::Track;
use crate::user::ListeningEvent;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Weight of genre overlap vs co-listening in track similarity.
const GENRE_WEIGHT: f64 = 0.6;
const COLISTEN_WEIGHT: f64 = 0.4;

/// Sessions longer than this many tracks contribute only their first
/// `MAX_SESSION_TRACKS` to pair counting, keeping the build pass from going
/// quadratic on marathon sessions.
const MAX_SESSION_TRACKS: usize = 50;

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Co-occurrence counts of track pairs within listening sessions.
///
/// A session is a run of one user's events where each event starts within
/// `session_gap_seconds` of the previous one. Each unordered track pair is
/// counted once per session.
#[derive(Default)]
pub struct CoListenIndex {
    pair_counts: HashMap<(String, String), u32>,
    max_count: u32,
}

impl CoListenIndex {
    /// Build the index from a window of listening events (any order).
    pub fn build(events: &[ListeningEvent], session_gap_seconds: i64) -> Self {
        let mut by_user: HashMap<usize, Vec<&ListeningEvent>> = HashMap::new();
        for event in events {
            by_user.entry(event.user_id).or_default().push(event);
        }

        let mut pair_counts: HashMap<(String, String), u32> = HashMap::new();
        for user_events in by_user.values_mut() {
            user_events.sort_by_key(|e| e.played_at);

            let mut session: Vec<&str> = Vec::new();
            let mut last_at: Option<i64> = None;
            for event in user_events.iter() {
                let gap_exceeded = last_at
                    .map(|at| event.played_at - at > session_gap_seconds)
                    .unwrap_or(false);
                if gap_exceeded {
                    Self::count_session(&mut pair_counts, &session);
                    session.clear();
                }
                session.push(&event.track_id);
                last_at = Some(event.played_at);
            }
            Self::count_session(&mut pair_counts, &session);
        }

        let max_count = pair_counts.values().copied().max().unwrap_or(0);
        CoListenIndex {
            pair_counts,
            max_count,
        }
    }

    fn count_session(pair_counts: &mut HashMap<(String, String), u32>, session: &[&str]) {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = session
            .iter()
            .copied()
            .filter(|t| seen.insert(*t))
            .take(MAX_SESSION_TRACKS)
            .collect();
        for (i, a) in unique.iter().enumerate() {
            for b in unique.iter().skip(i + 1) {
                *pair_counts.entry(ordered_pair(a, b)).or_insert(0) += 1;
            }
        }
    }

    /// Co-listen count for a pair, normalized by the busiest pair in the
    /// index. Zero when the index is empty or the pair never co-occurred.
    pub fn normalized_count(&self, a: &str, b: &str) -> f64 {
        if self.max_count == 0 {
            return 0.0;
        }
        self.pair_counts
            .get(&ordered_pair(a, b))
            .map(|c| *c as f64 / self.max_count as f64)
            .unwrap_or(0.0)
    }

    pub fn pair_count(&self) -> usize {
        self.pair_counts.len()
    }
}

/// Copy-on-write handle to the shared co-listen index.
///
/// Readers clone the Arc under a brief read lock; the rebuild job swaps in a
/// freshly built index under the write lock. Population never blocks readers
/// on the build itself.
pub struct CoListenCache {
    current: RwLock<Arc<CoListenIndex>>,
}

impl CoListenCache {
    pub fn empty() -> Self {
        CoListenCache {
            current: RwLock::new(Arc::new(CoListenIndex::default())),
        }
    }

    pub fn snapshot(&self) -> Arc<CoListenIndex> {
        self.current.read().unwrap().clone()
    }

    pub fn replace(&self, index: CoListenIndex) {
        *self.current.write().unwrap() = Arc::new(index);
    }
}

/// Cosine similarity over two tracks' weighted genre vectors.
pub fn genre_cosine(a: &Track, b: &Track) -> f64 {
    if a.genres.is_empty() || b.genres.is_empty() {
        return 0.0;
    }

    let b_weights: HashMap<&str, f64> = b
        .genres
        .iter()
        .map(|g| (g.genre.as_str(), g.weight))
        .collect();

    let mut dot = 0.0;
    for genre in &a.genres {
        if let Some(weight) = b_weights.get(genre.genre.as_str()) {
            dot += genre.weight * weight;
        }
    }
    if dot == 0.0 {
        return 0.0;
    }

    let norm_a: f64 = a.genres.iter().map(|g| g.weight * g.weight).sum::<f64>().sqrt();
    let norm_b: f64 = b.genres.iter().map(|g| g.weight * g.weight).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Per-request track similarity with pair memoization.
pub struct TrackSimilarity {
    colisten: Arc<CoListenIndex>,
    memo: HashMap<(String, String), f64>,
}

impl TrackSimilarity {
    pub fn new(colisten: Arc<CoListenIndex>) -> Self {
        TrackSimilarity {
            colisten,
            memo: HashMap::new(),
        }
    }

    /// Symmetric similarity in [0, 1].
    pub fn similarity(&mut self, a: &Track, b: &Track) -> f64 {
        if a.id == b.id {
            return 1.0;
        }
        let key = ordered_pair(&a.id, &b.id);
        if let Some(cached) = self.memo.get(&key) {
            return *cached;
        }
        let value = (GENRE_WEIGHT * genre_cosine(a, b)
            + COLISTEN_WEIGHT * self.colisten.normalized_count(&a.id, &b.id))
        .clamp(0.0, 1.0);
        self.memo.insert(key, value);
        value
    }
}

/// Cosine similarity over two users' sparse track-weight vectors. Users
/// sharing no track get 0 and are not neighbors.
pub fn user_cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut dot = 0.0;
    for (track_id, weight) in small {
        if let Some(other) = large.get(track_id) {
            dot += weight * other;
        }
    }
    if dot == 0.0 {
        return 0.0;
    }

    let norm_a: f64 = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|w| w * w).sum::<f64>().sqrt();
    dot / (norm_a * norm_b)
}
