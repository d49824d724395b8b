//! TOML file configuration structures.
//!
//! All fields are optional; values present in the file override CLI
//! arguments during [`AppConfig::resolve`](super::AppConfig::resolve).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub read_pool_size: Option<usize>,
    pub recommender: Option<RecommenderFileConfig>,
    pub background_jobs: Option<BackgroundJobsFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommenderFileConfig {
    pub window_days: Option<u32>,
    pub max_events_per_request: Option<usize>,
    pub window_event_limit: Option<usize>,
    pub candidate_pool_limit: Option<usize>,
    pub neighbor_count: Option<usize>,
    pub content_seed_count: Option<usize>,
    pub session_gap_minutes: Option<i64>,
    pub discovery_min_rating: Option<f64>,
    pub artist_relation_boost: Option<f64>,
    pub recommendation_ttl_hours: Option<i64>,
    pub playlist_overshoot_tolerance: Option<f64>,
    pub request_budget_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackgroundJobsFileConfig {
    pub batch_interval_hours: Option<u64>,
    pub batch_limit: Option<usize>,
    pub consumption_interval_minutes: Option<u64>,
    pub consumption_batch_size: Option<usize>,
    pub colisten_interval_hours: Option<u64>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path.as_ref()))
    }
}
