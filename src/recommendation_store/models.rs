use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The strategy (or strategy blend) a recommendation came from.
///
/// Hybrid labels are produced by the blender when two or more strategies
/// each contribute a meaningful share of the final score, e.g.
/// "hybrid_collaborative_content_based". Serializes as its snake_case
/// label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendationType {
    Collaborative,
    ContentBased,
    Popularity,
    Discovery,
    PlaylistGeneration,
    Hybrid(String),
}

impl Serialize for RecommendationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for RecommendationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        RecommendationType::parse(&label).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown recommendation type: {}", label))
        })
    }
}

impl RecommendationType {
    pub fn label(&self) -> String {
        match self {
            RecommendationType::Collaborative => "collaborative".to_string(),
            RecommendationType::ContentBased => "content_based".to_string(),
            RecommendationType::Popularity => "popularity".to_string(),
            RecommendationType::Discovery => "discovery".to_string(),
            RecommendationType::PlaylistGeneration => "playlist_generation".to_string(),
            RecommendationType::Hybrid(label) => label.clone(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "collaborative" => Some(RecommendationType::Collaborative),
            "content_based" => Some(RecommendationType::ContentBased),
            "popularity" => Some(RecommendationType::Popularity),
            "discovery" => Some(RecommendationType::Discovery),
            "playlist_generation" => Some(RecommendationType::PlaylistGeneration),
            s if s.starts_with("hybrid_") => Some(RecommendationType::Hybrid(s.to_string())),
            _ => None,
        }
    }
}

/// A persisted recommendation row.
///
/// Lifecycle: written at request or batch-generation time; `is_consumed`
/// flips to true exactly once when a matching listening event is observed;
/// the row goes inert (filtered from reads) once `expires_at` passes but is
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub user_id: usize,
    pub track_id: String,
    pub recommendation_type: RecommendationType,
    /// Blended score in [0, 1].
    pub score: f64,
    pub reason: String,
    pub metadata: Option<serde_json::Value>,
    pub is_consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
