//! Smart playlist assembly: greedy accumulation of ranked tracks against a
//! duration budget.
//!
//! Greedy-with-skip is a heuristic, not an optimal subset-sum; the realized
//! duration may differ from the target within the overshoot tolerance and
//! that is accepted, not an error.

use super::blender::RankedTrack;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlaylist {
    pub name: String,
    pub description: String,
    pub tracks: Vec<RankedTrack>,
    /// Realized duration; may differ from the requested target.
    pub total_duration_seconds: u32,
}

/// Walk the pool in rank order, taking every track that still fits within
/// `target_seconds * (1 + tolerance)` and skipping the ones that don't.
/// Linear in pool size.
pub fn assemble(
    pool: Vec<RankedTrack>,
    durations: &HashMap<String, u32>,
    target_seconds: u32,
    overshoot_tolerance: f64,
) -> (Vec<RankedTrack>, u32) {
    let budget = (target_seconds as f64 * (1.0 + overshoot_tolerance)) as u64;

    let mut selected = Vec::new();
    let mut total: u64 = 0;
    for track in pool {
        if total >= target_seconds as u64 {
            break;
        }
        let Some(duration) = durations.get(&track.track_id).copied() else {
            continue;
        };
        if duration == 0 {
            continue;
        }
        if total + duration as u64 <= budget {
            total += duration as u64;
            selected.push(track);
        }
        // else: overshoots too far, try the next-ranked track instead.
    }
    (selected, total as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation_store::RecommendationType;

    fn pool(entries: &[(&str, f64)]) -> Vec<RankedTrack> {
        entries
            .iter()
            .map(|(id, score)| RankedTrack {
                track_id: id.to_string(),
                score: *score,
                reason: "r".to_string(),
                recommendation_type: RecommendationType::PlaylistGeneration,
            })
            .collect()
    }

    #[test]
    fn stays_within_overshoot_tolerance() {
        let durations = HashMap::from([
            ("a".to_string(), 400_u32),
            ("b".to_string(), 400),
            ("c".to_string(), 400),
        ]);
        let (tracks, total) =
            assemble(pool(&[("a", 0.9), ("b", 0.8), ("c", 0.7)]), &durations, 600, 0.10);

        // a fits; b would reach 800 > 660; c likewise. Only a is taken.
        assert_eq!(tracks.len(), 1);
        assert_eq!(total, 400);
        assert!(total as f64 <= 600.0 * 1.10);
    }

    #[test]
    fn skips_oversized_track_and_takes_next() {
        let durations = HashMap::from([
            ("long".to_string(), 700_u32),
            ("short".to_string(), 500),
        ]);
        let (tracks, total) =
            assemble(pool(&[("long", 0.9), ("short", 0.8)]), &durations, 600, 0.10);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, "short");
        assert_eq!(total, 500);
    }

    #[test]
    fn stops_once_target_is_reached() {
        let durations = HashMap::from([
            ("a".to_string(), 300_u32),
            ("b".to_string(), 300),
            ("c".to_string(), 300),
        ]);
        let (tracks, total) =
            assemble(pool(&[("a", 0.9), ("b", 0.8), ("c", 0.7)]), &durations, 600, 0.10);

        assert_eq!(tracks.len(), 2);
        assert_eq!(total, 600);
    }

    #[test]
    fn unknown_durations_are_skipped() {
        let durations = HashMap::from([("known".to_string(), 300_u32)]);
        let (tracks, total) =
            assemble(pool(&[("ghost", 0.9), ("known", 0.8)]), &durations, 600, 0.10);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, "known");
        assert_eq!(total, 300);
    }
}
