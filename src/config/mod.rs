mod file_config;

pub use file_config::{BackgroundJobsFileConfig, FileConfig, RecommenderFileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub read_pool_size: usize,
}

/// Tunables of the recommendation engine. Defaults match the interactive
/// endpoints; batch generation reuses the same settings.
#[derive(Debug, Clone)]
pub struct RecommenderSettings {
    /// Listening-history window in days for signal reads.
    pub window_days: u32,
    /// Row cap on a single user's event read.
    pub max_events_per_request: usize,
    /// Row cap on the all-users window read (co-listening, neighbors).
    pub window_event_limit: usize,
    /// Cap on the candidate track pool per request.
    pub candidate_pool_limit: usize,
    /// k for k-nearest-neighbor collaborative filtering.
    pub neighbor_count: usize,
    /// Number of seed tracks for content-based scoring.
    pub content_seed_count: usize,
    /// Two plays within this gap belong to the same listening session.
    pub session_gap_minutes: i64,
    /// Minimum average rating for a track to qualify as a hidden gem.
    pub discovery_min_rating: f64,
    /// Score boost factor for artist-relationship matches.
    pub artist_relation_boost: f64,
    /// TTL applied to generated recommendation rows.
    pub recommendation_ttl_hours: i64,
    /// Playlists may overshoot the duration target by this fraction.
    pub playlist_overshoot_tolerance: f64,
    /// Wall-clock budget for an interactive request; strategies that miss
    /// it are dropped from the blend.
    pub request_budget_ms: u64,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            window_days: 90,
            max_events_per_request: 5_000,
            window_event_limit: 20_000,
            candidate_pool_limit: 2_000,
            neighbor_count: 20,
            content_seed_count: 10,
            session_gap_minutes: 30,
            discovery_min_rating: 4.5,
            artist_relation_boost: 0.2,
            recommendation_ttl_hours: 24,
            playlist_overshoot_tolerance: 0.10,
            request_budget_ms: 250,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundJobsSettings {
    pub batch_interval_hours: u64,
    /// Recommendations generated per user by the batch job.
    pub batch_limit: usize,
    pub consumption_interval_minutes: u64,
    /// Listening events processed per consumption watchdog run.
    pub consumption_batch_size: usize,
    pub colisten_interval_hours: u64,
}

impl Default for BackgroundJobsSettings {
    fn default() -> Self {
        Self {
            batch_interval_hours: 6,
            batch_limit: 20,
            consumption_interval_minutes: 5,
            consumption_batch_size: 1_000,
            colisten_interval_hours: 6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub read_pool_size: usize,
    pub recommender: RecommenderSettings,
    pub background_jobs: BackgroundJobsSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size).max(1);

        let defaults = RecommenderSettings::default();
        let rec_file = file.recommender.unwrap_or_default();
        let recommender = RecommenderSettings {
            window_days: rec_file.window_days.unwrap_or(defaults.window_days),
            max_events_per_request: rec_file
                .max_events_per_request
                .unwrap_or(defaults.max_events_per_request),
            window_event_limit: rec_file
                .window_event_limit
                .unwrap_or(defaults.window_event_limit),
            candidate_pool_limit: rec_file
                .candidate_pool_limit
                .unwrap_or(defaults.candidate_pool_limit),
            neighbor_count: rec_file.neighbor_count.unwrap_or(defaults.neighbor_count),
            content_seed_count: rec_file
                .content_seed_count
                .unwrap_or(defaults.content_seed_count),
            session_gap_minutes: rec_file
                .session_gap_minutes
                .unwrap_or(defaults.session_gap_minutes),
            discovery_min_rating: rec_file
                .discovery_min_rating
                .unwrap_or(defaults.discovery_min_rating),
            artist_relation_boost: rec_file
                .artist_relation_boost
                .unwrap_or(defaults.artist_relation_boost),
            recommendation_ttl_hours: rec_file
                .recommendation_ttl_hours
                .unwrap_or(defaults.recommendation_ttl_hours),
            playlist_overshoot_tolerance: rec_file
                .playlist_overshoot_tolerance
                .unwrap_or(defaults.playlist_overshoot_tolerance),
            request_budget_ms: rec_file
                .request_budget_ms
                .unwrap_or(defaults.request_budget_ms),
        };

        if recommender.discovery_min_rating < 1.0 || recommender.discovery_min_rating > 5.0 {
            bail!(
                "discovery_min_rating must be within 1.0..=5.0, got {}",
                recommender.discovery_min_rating
            );
        }
        if recommender.playlist_overshoot_tolerance < 0.0 {
            bail!("playlist_overshoot_tolerance must not be negative");
        }

        let job_defaults = BackgroundJobsSettings::default();
        let jobs_file = file.background_jobs.unwrap_or_default();
        let background_jobs = BackgroundJobsSettings {
            batch_interval_hours: jobs_file
                .batch_interval_hours
                .unwrap_or(job_defaults.batch_interval_hours),
            batch_limit: jobs_file.batch_limit.unwrap_or(job_defaults.batch_limit),
            consumption_interval_minutes: jobs_file
                .consumption_interval_minutes
                .unwrap_or(job_defaults.consumption_interval_minutes),
            consumption_batch_size: jobs_file
                .consumption_batch_size
                .unwrap_or(job_defaults.consumption_batch_size),
            colisten_interval_hours: jobs_file
                .colisten_interval_hours
                .unwrap_or(job_defaults.colisten_interval_hours),
        };

        Ok(Self {
            db_dir,
            read_pool_size,
            recommender,
            background_jobs,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn recommendations_db_path(&self) -> PathBuf {
        self.db_dir.join("recommendations.db")
    }

    pub fn server_db_path(&self) -> PathBuf {
        self.db_dir.join("server.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_cli() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            db_dir: Some(dir.path().to_path_buf()),
            read_pool_size: 4,
        };
        let file = FileConfig {
            read_pool_size: Some(8),
            recommender: Some(RecommenderFileConfig {
                neighbor_count: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.read_pool_size, 8);
        assert_eq!(config.recommender.neighbor_count, 5);
        // Unspecified values fall back to defaults.
        assert_eq!(config.recommender.window_days, 90);
    }

    #[test]
    fn missing_db_dir_is_an_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("db_dir"));
    }

    #[test]
    fn invalid_discovery_rating_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = CliConfig {
            db_dir: Some(dir.path().to_path_buf()),
            read_pool_size: 4,
        };
        let file = FileConfig {
            recommender: Some(RecommenderFileConfig {
                discovery_min_rating: Some(7.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(AppConfig::resolve(&cli, Some(file)).is_err());
    }
}
