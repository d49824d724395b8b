//! CatalogStore trait definition.
//!
//! The catalog is owned by the external library-sync pipeline; the
//! recommender only reads it. The writable extension exists for that
//! pipeline (and for test seeding), not for the engine.

use super::models::{ArtistRelationship, Track};
use anyhow::Result;

pub trait CatalogStore: Send + Sync {
    /// Get a track by ID with its genre tags loaded.
    fn get_track(&self, id: &str) -> Result<Option<Track>>;

    /// List tracks with genre tags loaded, bounded by `limit`.
    ///
    /// This is the candidate pool source; callers apply per-user exclusions
    /// (banned tracks) on top.
    fn list_tracks(&self, limit: usize) -> Result<Vec<Track>>;

    /// Number of tracks in the catalog.
    fn get_tracks_count(&self) -> usize;

    /// Outgoing relationship edges for an artist. Directional: only edges
    /// where `artist_id` is the origin are returned.
    fn get_artist_relationships(&self, artist_id: &str) -> Result<Vec<ArtistRelationship>>;

    /// The play count at the catalog's bottom quartile, used as the
    /// "underplayed" cutoff for discovery. Zero for an empty catalog.
    fn bottom_quartile_play_count(&self) -> Result<u64>;
}

/// Write operations used by the external sync pipeline and by test seeding.
pub trait WritableCatalogStore: CatalogStore {
    /// Insert a track and its genre tags.
    fn insert_track(&self, track: &Track) -> Result<()>;

    /// Insert a directed artist relationship edge.
    fn insert_artist_relationship(&self, relationship: &ArtistRelationship) -> Result<()>;

    /// Overwrite a track's externally-owned counters.
    fn set_track_counters(
        &self,
        track_id: &str,
        play_count: u64,
        love_count: u64,
        last_played_at: Option<i64>,
    ) -> Result<()>;
}
