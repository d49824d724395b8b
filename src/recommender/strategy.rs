use crate::recommendation_store::RecommendationType;
use std::collections::HashMap;

/// The closed set of scoring strategies. The blender iterates this fixed
/// set rather than dispatching through open-ended plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Collaborative,
    ContentBased,
    Popularity,
    Discovery,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Collaborative,
        StrategyKind::ContentBased,
        StrategyKind::Popularity,
        StrategyKind::Discovery,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StrategyKind::Collaborative => "collaborative",
            StrategyKind::ContentBased => "content_based",
            StrategyKind::Popularity => "popularity",
            StrategyKind::Discovery => "discovery",
        }
    }

    pub fn recommendation_type(&self) -> RecommendationType {
        match self {
            StrategyKind::Collaborative => RecommendationType::Collaborative,
            StrategyKind::ContentBased => RecommendationType::ContentBased,
            StrategyKind::Popularity => RecommendationType::Popularity,
            StrategyKind::Discovery => RecommendationType::Discovery,
        }
    }
}

/// Score and explanation a strategy produced for one track.
#[derive(Debug, Clone)]
pub struct ScoreEntry {
    /// Strategy-local score in [0, 1].
    pub score: f64,
    pub reason: String,
}

/// One strategy's output over the candidate set.
pub type StrategyScores = HashMap<String, ScoreEntry>;

/// Per-strategy blend weights. Strategies that produced no coverage are
/// excluded and the remaining weights renormalized at blend time.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyWeights {
    pub collaborative: f64,
    pub content_based: f64,
    pub popularity: f64,
    pub discovery: f64,
}

impl StrategyWeights {
    /// Default mix for the personalized endpoint.
    pub fn personalized() -> Self {
        Self {
            collaborative: 0.4,
            content_based: 0.4,
            popularity: 0.2,
            discovery: 0.0,
        }
    }

    /// Popularity-only mix for the trending feed.
    pub fn trending() -> Self {
        Self {
            collaborative: 0.0,
            content_based: 0.0,
            popularity: 1.0,
            discovery: 0.0,
        }
    }

    /// Discovery-only mix for the hidden-gems feed.
    pub fn discovery() -> Self {
        Self {
            collaborative: 0.0,
            content_based: 0.0,
            popularity: 0.0,
            discovery: 1.0,
        }
    }

    pub fn equal() -> Self {
        Self {
            collaborative: 0.25,
            content_based: 0.25,
            popularity: 0.25,
            discovery: 0.25,
        }
    }

    pub fn get(&self, kind: StrategyKind) -> f64 {
        match kind {
            StrategyKind::Collaborative => self.collaborative,
            StrategyKind::ContentBased => self.content_based,
            StrategyKind::Popularity => self.popularity,
            StrategyKind::Discovery => self.discovery,
        }
    }

    /// Strategies worth running for this mix.
    pub fn active_kinds(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind) > 0.0)
            .collect()
    }
}
