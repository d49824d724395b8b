use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A track in the catalog.
///
/// `play_count`, `love_count` and `last_played_at` are global counters owned
/// by the external play-event pipeline; this side only ever reads a snapshot
/// of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub album_id: Option<String>,
    pub duration_seconds: u32,
    pub play_count: u64,
    pub love_count: u64,
    pub last_played_at: Option<DateTime<Utc>>,
    /// Weighted genre tags, each weight in [0, 1].
    pub genres: Vec<GenreWeight>,
}

impl Track {
    /// Weight of a genre tag on this track, 0.0 when untagged.
    pub fn genre_weight(&self, genre: &str) -> f64 {
        self.genres
            .iter()
            .find(|g| g.genre.eq_ignore_ascii_case(genre))
            .map(|g| g.weight)
            .unwrap_or(0.0)
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.genre.eq_ignore_ascii_case(genre))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreWeight {
    pub genre: String,
    pub weight: f64,
}

/// Type of a directed artist-to-artist relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Similar,
    Influence,
    Collaboration,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Similar => "similar",
            RelationshipType::Influence => "influence",
            RelationshipType::Collaboration => "collaboration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "similar" => Some(RelationshipType::Similar),
            "influence" => Some(RelationshipType::Influence),
            "collaboration" => Some(RelationshipType::Collaboration),
            _ => None,
        }
    }
}

/// A directed edge between two artists. Direction matters: a relationship
/// from A to B says nothing about B to A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRelationship {
    pub artist_id: String,
    pub related_artist_id: String,
    pub relationship_type: RelationshipType,
    /// Edge strength in [0, 1].
    pub strength: f64,
}
