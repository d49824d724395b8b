//! End-to-end tests for smart playlist generation.

mod common;

use common::TestEnv;
use resonata_recommender::recommender::RecommendError;

fn seed_catalog(env: &TestEnv) {
    // Twenty-five ~4 minute synthwave tracks with popularity spread, plus
    // some off-genre filler.
    for i in 0..25u32 {
        env.add_track(
            &format!("s{:02}", i),
            "a_synth",
            200 + (i % 5) * 20,
            &[("synthwave", 0.9), ("electronic", 0.4)],
            (100 - i) as u64,
        );
    }
    for i in 0..5 {
        env.add_track(&format!("r{:02}", i), "a_rock", 240, &[("rock", 1.0)], 50);
    }
}

#[tokio::test]
async fn sixty_minute_playlist_lands_within_tolerance() {
    let env = TestEnv::new();
    seed_catalog(&env);
    let user_id = env.create_user("ada");
    env.play(user_id, "s00", 4);
    env.love(user_id, "s00");

    let playlist = env
        .engine
        .generate_playlist(user_id, "Focus", "Deep work mix", 60, None, None)
        .await
        .unwrap();

    assert_eq!(playlist.name, "Focus");
    assert!(!playlist.tracks.is_empty());

    // Realized duration: at least the target minus one track's worth of
    // slack, never more than target + 10%.
    let target: u32 = 60 * 60;
    assert!(playlist.total_duration_seconds as f64 <= target as f64 * 1.10);
    assert!(playlist.total_duration_seconds >= target - 300);

    // The reported total matches the sum of the selected tracks.
    let mut expected = 0_u32;
    for track in &playlist.tracks {
        let stored = env.catalog_track_duration(&track.track_id);
        expected += stored;
    }
    assert_eq!(playlist.total_duration_seconds, expected);
}

#[tokio::test]
async fn genre_constrained_playlist_only_uses_matching_tracks() {
    let env = TestEnv::new();
    seed_catalog(&env);
    let user_id = env.create_user("ada");
    env.play(user_id, "s00", 4);

    let playlist = env
        .engine
        .generate_playlist(user_id, "Waves", "", 20, Some("synthwave"), None)
        .await
        .unwrap();

    assert!(!playlist.tracks.is_empty());
    assert!(playlist.tracks.iter().all(|t| t.track_id.starts_with('s')));
}

#[tokio::test]
async fn zero_duration_playlist_is_rejected() {
    let env = TestEnv::new();
    seed_catalog(&env);
    let user_id = env.create_user("ada");

    let result = env
        .engine
        .generate_playlist(user_id, "Nothing", "", 0, None, None)
        .await;
    assert!(matches!(result, Err(RecommendError::InvalidParameter(_))));
}

#[tokio::test]
async fn playlist_for_cold_user_still_assembles() {
    let env = TestEnv::new();
    seed_catalog(&env);
    let user_id = env.create_user("cold");

    let playlist = env
        .engine
        .generate_playlist(user_id, "Starter", "", 30, None, None)
        .await
        .unwrap();

    assert!(!playlist.tracks.is_empty());
    assert!(playlist.total_duration_seconds as f64 <= 30.0 * 60.0 * 1.10);
}
