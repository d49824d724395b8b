//! Shared test harness: temp-directory SQLite stores, seeding helpers and
//! an engine wired the way the binary wires it. Transport is out of scope,
//! so tests drive the engine API directly.

#![allow(dead_code)] // not every suite uses every helper

use chrono::{DateTime, Duration, Utc};
use resonata_recommender::catalog_store::{
    ArtistRelationship, GenreWeight, RelationshipType, SqliteCatalogStore, Track,
    WritableCatalogStore,
};
use resonata_recommender::config::RecommenderSettings;
use resonata_recommender::recommendation_store::SqliteRecommendationStore;
use resonata_recommender::recommender::RecommendationEngine;
use resonata_recommender::server_store::SqliteServerStore;
use resonata_recommender::user::{
    ListeningEvent, Rating, SqliteUserStore, UserListeningStore, UserRatingStore, UserStore,
};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestEnv {
    pub engine: Arc<RecommendationEngine>,
    pub catalog: Arc<SqliteCatalogStore>,
    pub users: Arc<SqliteUserStore>,
    pub recommendations: Arc<SqliteRecommendationStore>,
    pub server: Arc<SqliteServerStore>,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        // A roomy request budget: these tests assert ranking semantics, not
        // deadline behavior, and CI machines can stall blocking tasks.
        let settings = RecommenderSettings {
            request_budget_ms: 10_000,
            ..Default::default()
        };
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: RecommenderSettings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(SqliteCatalogStore::new(dir.path().join("catalog.db"), 2).unwrap());
        let users = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let recommendations = Arc::new(
            SqliteRecommendationStore::new(dir.path().join("recommendations.db")).unwrap(),
        );
        let server = Arc::new(SqliteServerStore::new(dir.path().join("server.db")).unwrap());

        let engine = Arc::new(RecommendationEngine::new(
            catalog.clone(),
            users.clone(),
            recommendations.clone(),
            settings,
        ));

        TestEnv {
            engine,
            catalog,
            users,
            recommendations,
            server,
            _dir: dir,
        }
    }

    pub fn add_track(
        &self,
        id: &str,
        artist_id: &str,
        duration_seconds: u32,
        genres: &[(&str, f64)],
        play_count: u64,
    ) {
        self.catalog
            .insert_track(&Track {
                id: id.to_string(),
                title: format!("Track {}", id),
                artist_id: artist_id.to_string(),
                album_id: None,
                duration_seconds,
                play_count,
                love_count: 0,
                last_played_at: None,
                genres: genres
                    .iter()
                    .map(|(genre, weight)| GenreWeight {
                        genre: genre.to_string(),
                        weight: *weight,
                    })
                    .collect(),
            })
            .unwrap();
    }

    pub fn relate_artists(&self, from: &str, to: &str, strength: f64) {
        self.catalog
            .insert_artist_relationship(&ArtistRelationship {
                artist_id: from.to_string(),
                related_artist_id: to.to_string(),
                relationship_type: RelationshipType::Similar,
                strength,
            })
            .unwrap();
    }

    pub fn create_user(&self, handle: &str) -> usize {
        self.users.create_user(handle).unwrap()
    }

    /// Record a completed play at a given offset into the past.
    pub fn play(&self, user_id: usize, track_id: &str, hours_ago: i64) {
        self.play_with_completion(user_id, track_id, hours_ago, 0.95);
    }

    pub fn play_with_completion(
        &self,
        user_id: usize,
        track_id: &str,
        hours_ago: i64,
        completion: f64,
    ) {
        let played_at = Utc::now() - Duration::hours(hours_ago);
        self.users
            .record_listening_event(ListeningEvent {
                id: None,
                user_id,
                track_id: track_id.to_string(),
                session_id: None,
                played_at: played_at.timestamp(),
                play_duration_seconds: 180,
                completion,
                source: Some("album".to_string()),
                date: yyyymmdd(played_at),
            })
            .unwrap();
    }

    pub fn love(&self, user_id: usize, track_id: &str) {
        self.rate_full(user_id, track_id, None, true, false);
    }

    pub fn ban(&self, user_id: usize, track_id: &str) {
        self.rate_full(user_id, track_id, None, false, true);
    }

    pub fn rate(&self, user_id: usize, track_id: &str, stars: u8) {
        self.rate_full(user_id, track_id, Some(stars), false, false);
    }

    pub fn rate_full(
        &self,
        user_id: usize,
        track_id: &str,
        rating: Option<u8>,
        is_loved: bool,
        is_banned: bool,
    ) {
        self.users
            .upsert_rating(Rating {
                user_id,
                track_id: track_id.to_string(),
                rating,
                is_loved,
                is_banned,
                updated_at: Utc::now().timestamp(),
            })
            .unwrap();
    }

    pub fn refresh_colisten(&self) {
        self.engine.rebuild_colisten_index().unwrap();
    }

    pub fn catalog_track_duration(&self, track_id: &str) -> u32 {
        use resonata_recommender::catalog_store::CatalogStore;
        self.catalog
            .get_track(track_id)
            .unwrap()
            .expect("track should exist")
            .duration_seconds
    }
}

pub fn yyyymmdd(at: DateTime<Utc>) -> u32 {
    at.format("%Y%m%d").to_string().parse().unwrap()
}
