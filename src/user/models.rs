//! User data models.

use serde::{Deserialize, Serialize};

/// Completion fraction above which a listening event counts as a play.
///
/// Shared with the external play-count accounting; changing it here without
/// changing it there skews popularity scores.
pub const PLAYED_COMPLETION_THRESHOLD: f64 = 0.5;

/// Individual listening event recorded when a user plays a track.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListeningEvent {
    pub id: Option<usize>,
    pub user_id: usize,
    pub track_id: String,
    /// Client-generated UUID for deduplication (supports offline queue retry).
    pub session_id: Option<String>,
    /// Unix timestamp when playback started.
    pub played_at: i64,
    /// Actual listening time in seconds (excluding pauses).
    pub play_duration_seconds: u32,
    /// Fraction of the track that was played, in [0, 1].
    pub completion: f64,
    /// Where playback started: "album", "playlist", "radio", "search".
    pub source: Option<String>,
    /// Date in YYYYMMDD format for efficient range queries.
    pub date: u32,
}

impl ListeningEvent {
    /// Whether this event counts toward play signals.
    pub fn counts_as_played(&self) -> bool {
        self.completion > PLAYED_COMPLETION_THRESHOLD
    }
}

/// A user's rating state for a track. One row per (user, track); updates
/// overwrite.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Rating {
    pub user_id: usize,
    pub track_id: String,
    /// Star rating 1..=5, None when the user only loved/banned the track.
    pub rating: Option<u8>,
    pub is_loved: bool,
    /// Banned tracks must never appear in any recommendation output for
    /// this user.
    pub is_banned: bool,
    pub updated_at: i64,
}

/// Per-track play count aggregated from listening events within a window.
/// Only events whose completion crosses [`PLAYED_COMPLETION_THRESHOLD`]
/// are counted.
#[derive(Serialize, Debug, Clone)]
pub struct TrackPlayStats {
    pub track_id: String,
    pub play_count: u64,
    pub unique_listeners: u64,
}

/// Catalog-wide rating aggregate for a track.
#[derive(Serialize, Debug, Clone)]
pub struct TrackRatingStats {
    pub track_id: String,
    pub average_rating: f64,
    pub rating_count: u64,
}
