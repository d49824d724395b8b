//! End-to-end tests for the trending and discovery feeds.

mod common;

use common::TestEnv;
use resonata_recommender::recommender::TrendingPeriod;

#[tokio::test]
async fn trending_ranks_by_windowed_plays_with_stable_ties() {
    let env = TestEnv::new();
    // Global counters say t_old is huge, but the trending window only sees
    // recent events.
    env.add_track("t_old", "a1", 200, &[("rock", 1.0)], 10_000);
    env.add_track("t_hot", "a1", 200, &[("rock", 1.0)], 10);
    env.add_track("t_b", "a2", 200, &[("rock", 1.0)], 5);
    env.add_track("t_a", "a2", 200, &[("rock", 1.0)], 5);

    let ada = env.create_user("ada");
    let bob = env.create_user("bob");
    // t_hot: three plays within the last week.
    env.play(ada, "t_hot", 2);
    env.play(bob, "t_hot", 20);
    env.play(ada, "t_hot", 40);
    // t_a and t_b: one play each -> tied, broken by track id ascending.
    env.play(ada, "t_a", 10);
    env.play(bob, "t_b", 12);
    // t_old: only an ancient play, outside the 7-day window.
    env.play(ada, "t_old", 24 * 20);

    let results = env.engine.get_trending(TrendingPeriod::Last7Days).await.unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.track_id.as_str()).collect();
    assert_eq!(order, vec!["t_hot", "t_a", "t_b"]);
    for entry in &results {
        assert!(entry.score >= 0.0 && entry.score <= 1.0);
        assert_eq!(entry.recommendation_type.label(), "popularity");
    }
}

#[tokio::test]
async fn trending_ignores_partial_plays() {
    let env = TestEnv::new();
    env.add_track("t_full", "a1", 200, &[("rock", 1.0)], 0);
    env.add_track("t_skip", "a1", 200, &[("rock", 1.0)], 0);

    let ada = env.create_user("ada");
    env.play(ada, "t_full", 2);
    // Below the completion threshold: does not count as played.
    env.play_with_completion(ada, "t_skip", 2, 0.3);

    let results = env.engine.get_trending(TrendingPeriod::Last7Days).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].track_id, "t_full");
}

#[tokio::test]
async fn discovery_returns_only_qualifying_hidden_gems() {
    let env = TestEnv::new();
    // Catalog popularity spread; the bottom-quartile cutoff lands low.
    env.add_track("gem", "a1", 200, &[("jazz", 1.0)], 2);
    env.add_track("popular_great", "a1", 200, &[("jazz", 1.0)], 5_000);
    env.add_track("obscure_meh", "a2", 200, &[("jazz", 1.0)], 1);
    env.add_track("filler", "a2", 200, &[("jazz", 1.0)], 500);

    let ada = env.create_user("ada");
    let bob = env.create_user("bob");
    // gem: rated 5 by two users, barely played.
    env.rate(ada, "gem", 5);
    env.rate(bob, "gem", 5);
    // popular_great: excellent but too popular to be a gem.
    env.rate(ada, "popular_great", 5);
    // obscure_meh: underplayed but below the rating threshold.
    env.rate(ada, "obscure_meh", 3);

    let results = env.engine.get_discovery(Some(10)).await.unwrap();

    assert_eq!(results.len(), 1);
    let gem = &results[0];
    assert_eq!(gem.track_id, "gem");
    assert_eq!(gem.recommendation_type.label(), "discovery");
    assert_eq!(gem.reason, "Hidden gem - high quality, underplayed track");
    // Score is the average rating rescaled into [0, 1].
    assert!((gem.score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn discovery_is_empty_when_nothing_qualifies() {
    let env = TestEnv::new();
    env.add_track("t1", "a1", 200, &[("rock", 1.0)], 100);
    let ada = env.create_user("ada");
    env.rate(ada, "t1", 4);

    let results = env.engine.get_discovery(None).await.unwrap();
    assert!(results.is_empty());
}
