//! The recommendation engine core: signal snapshot, scoring strategies,
//! blender/ranker, playlist generator.

mod blender;
mod collaborative;
mod content_based;
mod discovery;
mod engine;
mod error;
mod playlist;
mod popularity;
mod signals;
mod strategy;

pub use blender::{RankedTrack, DEFAULT_LIMIT, MAX_LIMIT};
pub use engine::{
    GenerateOutcome, RecommendRequest, RecommendationEngine, TrendingPeriod,
};
pub use error::RecommendError;
pub use playlist::GeneratedPlaylist;
pub use signals::SignalSnapshot;
pub use strategy::{ScoreEntry, StrategyKind, StrategyScores, StrategyWeights};
