use anyhow::{Context, Result};
use clap::Parser;
use resonata_recommender::background_jobs::jobs::{
    BatchRecommendationsJob, ColistenRefreshJob, ConsumptionWatchdogJob,
};
use resonata_recommender::background_jobs::{JobContext, JobScheduler};
use resonata_recommender::config::{AppConfig, CliConfig, FileConfig};
use resonata_recommender::recommender::RecommendationEngine;
use resonata_recommender::{
    CatalogStore, SqliteCatalogStore, SqliteRecommendationStore, SqliteServerStore,
    SqliteUserStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path_buf,
        Err(e) => return Err(e).with_context(|| format!("Error resolving path: {}", s)),
    };
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite databases (catalog, user,
    /// recommendations, server).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to an optional TOML config file; values there override CLI
    /// arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Number of read connections for the catalog store.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Starting resonata-recommender {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = cli_args.config.as_ref().map(FileConfig::load).transpose()?;
    let config = AppConfig::resolve(
        &CliConfig {
            db_dir: cli_args.db_dir,
            read_pool_size: cli_args.read_pool_size,
        },
        file_config,
    )?;

    info!("Opening SQLite databases in {:?}...", config.db_dir);
    let catalog_store = Arc::new(SqliteCatalogStore::new(
        config.catalog_db_path(),
        config.read_pool_size,
    )?);
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);
    let recommendation_store = Arc::new(SqliteRecommendationStore::new(
        config.recommendations_db_path(),
    )?);
    let server_store = Arc::new(SqliteServerStore::new(config.server_db_path())?);

    let engine = Arc::new(RecommendationEngine::new(
        catalog_store.clone(),
        user_store.clone(),
        recommendation_store.clone(),
        config.recommender.clone(),
    ));

    let cancellation_token = CancellationToken::new();
    let job_ctx = JobContext {
        cancellation_token: cancellation_token.clone(),
        engine: engine.clone(),
        user_store: user_store.clone(),
        recommendation_store: recommendation_store.clone(),
        server_store: server_store.clone(),
        settings: config.background_jobs.clone(),
    };

    let mut scheduler = JobScheduler::new(job_ctx);
    scheduler.register(Arc::new(ColistenRefreshJob::from_settings(
        &config.background_jobs,
    )));
    scheduler.register(Arc::new(BatchRecommendationsJob::from_settings(
        &config.background_jobs,
    )));
    scheduler.register(Arc::new(ConsumptionWatchdogJob::from_settings(
        &config.background_jobs,
    )));
    info!("Starting background jobs: {:?}", scheduler.job_ids());
    let scheduler_handle = scheduler.start();

    info!(
        "Engine ready: {} tracks in catalog",
        catalog_store.get_tracks_count()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, draining background jobs...");
    cancellation_token.cancel();
    scheduler_handle.shutdown().await;
    info!("Bye!");
    Ok(())
}
