use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_personalization::{
    config::KeyspaceConfig,
    storage::{KeyValueStore, StorageError},
    utils::{FixedClock, RandomSource},
    ForYouOptions, MemoryStore, Post, RecommendationService, Track,
};
use std::collections::HashSet;
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn post(id: &str, category: &str, age: Duration) -> Post {
    Post {
        id: id.to_string(),
        author_id: Some(format!("author-{}", id)),
        category: Some(category.to_string()),
        title: String::new(),
        content: String::new(),
        created_at: now() - age,
        like_count: 0,
        comment_count: 0,
    }
}

async fn service_with(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<FixedClock>,
) -> RecommendationService {
    RecommendationService::load(store, KeyspaceConfig::default(), clock, RandomSource::seeded(5))
        .await
}

async fn fresh_service() -> RecommendationService {
    service_with(
        Arc::new(MemoryStore::new()),
        Arc::new(FixedClock::new(now())),
    )
    .await
}

/// Store whose every operation fails, as an unreachable backend would.
struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk unavailable".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_view_cap_keeps_most_recent_distinct_posts() {
    let clock = Arc::new(FixedClock::new(now()));
    let mut svc = service_with(Arc::new(MemoryStore::new()), clock.clone()).await;

    for i in 0..250 {
        clock.advance(Duration::seconds(1));
        svc.track_view(&post(&format!("p{}", i), "misc", Duration::zero()))
            .await;
    }

    let views = &svc.history().snapshot().views;
    assert_eq!(views.len(), 200);
    let ids: HashSet<&str> = views.iter().map(|e| e.post_id.as_str()).collect();
    let expected: HashSet<String> = (50..250).map(|i| format!("p{}", i)).collect();
    assert!(expected.iter().all(|id| ids.contains(id.as_str())));
    assert_eq!(views[0].post_id, "p249");
}

#[tokio::test]
async fn test_unlike_never_decreases_affinity() {
    let mut svc = fresh_service().await;
    let p = post("liked", "trading", Duration::hours(1));

    svc.track_like(&p).await;
    let before = svc.history().snapshot().affinity.clone();

    svc.track_unlike("liked").await;
    svc.track_unlike("never-liked").await;

    let after = &svc.history().snapshot().affinity;
    assert!(!svc.is_liked("liked"));
    assert_eq!(after, &before);
    assert_eq!(after.category(Some("trading")), 5.0);
    assert_eq!(after.author(Some("author-liked")), 5.0);
    assert_eq!(after.track_scores.trading, 5.0);
}

#[tokio::test]
async fn test_unsave_leaves_views_untouched() {
    let mut svc = fresh_service().await;
    let p = post("s", "wellness", Duration::hours(1));

    svc.track_view(&p).await;
    svc.track_save(&p).await;
    assert!(svc.is_saved("s"));

    svc.track_unsave("s").await;
    assert!(!svc.is_saved("s"));
    assert_eq!(svc.get_engagement_stats().views, 1);
}

#[tokio::test]
async fn test_cold_start_returns_limit_from_input() {
    let svc = fresh_service().await;
    let posts: Vec<Post> = (0..10)
        .map(|i| post(&format!("p{}", i), "misc", Duration::hours(i)))
        .collect();

    let feed = svc.get_for_you_posts(&posts, &ForYouOptions::with_limit(5));
    assert_eq!(feed.len(), 5);
    let input: HashSet<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert!(feed.iter().all(|sp| input.contains(sp.post.id.as_str())));
}

#[tokio::test]
async fn test_category_affinity_and_recency_beat_stale_post() {
    let mut svc = fresh_service().await;
    for i in 0..3 {
        svc.track_view(&post(&format!("seen{}", i), "trading", Duration::days(3)))
            .await;
    }

    let posts = vec![
        post("b", "wellness", Duration::days(20)),
        post("a", "trading", Duration::zero()),
    ];

    for _ in 0..10 {
        let feed = svc.get_for_you_posts(&posts, &ForYouOptions::with_limit(2));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].post.id, "a");
        assert!(feed[0].score > feed[1].score);
    }
}

#[tokio::test]
async fn test_recently_viewed_post_is_penalized() {
    let clock = Arc::new(FixedClock::new(now()));
    let mut svc = service_with(Arc::new(MemoryStore::new()), clock.clone()).await;
    let p = post("p", "misc", Duration::hours(2));

    let base = svc.explain_score(&p).total;
    svc.track_view(&p).await;
    clock.advance(Duration::hours(1));

    let breakdown = svc.explain_score(&p);
    assert!(base > 0.0);
    assert!((breakdown.total - breakdown.base() * 0.3).abs() < 1e-9);

    let feed = svc.get_for_you_posts(std::slice::from_ref(&p), &ForYouOptions::with_limit(1));
    assert!((feed[0].score - breakdown.total).abs() < 1e-9);
}

#[tokio::test]
async fn test_trending_excludes_old_viral_post() {
    let svc = fresh_service().await;
    let mut viral = post("viral", "misc", Duration::days(10));
    viral.like_count = 1000;
    let fresh = post("fresh", "misc", Duration::days(1));

    let feed = svc.get_trending_posts(&[viral, fresh], 10);
    let ids: Vec<&str> = feed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["fresh"]);
}

#[tokio::test]
async fn test_track_and_following_feeds() {
    let svc = fresh_service().await;
    let posts = vec![
        post("w", "wellness", Duration::hours(1)),
        post("t", "trading", Duration::hours(2)),
        post("i", "integration", Duration::hours(3)),
    ];

    let track_feed = svc.get_track_posts(&posts, Track::Integration, 5);
    assert_eq!(track_feed.len(), 1);
    assert_eq!(track_feed[0].id, "i");

    let following: HashSet<String> = ["author-t".to_string(), "author-w".to_string()]
        .into_iter()
        .collect();
    let following_feed = svc.get_following_posts(&posts, &following, 5);
    let ids: Vec<&str> = following_feed.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["w", "t"]);
}

#[tokio::test]
async fn test_similar_posts_exclude_source() {
    let svc = fresh_service().await;
    let source = post("src", "trading", Duration::zero());
    let posts = vec![
        source.clone(),
        post("same-cat", "trading", Duration::days(1)),
        post("other", "cooking", Duration::days(1)),
    ];

    let similar = svc.get_similar_posts(&source, &posts, 10);
    assert_eq!(similar.len(), 2);
    assert!(similar.iter().all(|sp| sp.post.id != "src"));
    assert_eq!(similar[0].post.id, "same-cat");
}

#[tokio::test]
async fn test_storage_failures_degrade_gracefully() {
    let mut svc = service_with(Arc::new(FailingStore), Arc::new(FixedClock::new(now()))).await;
    let p = post("p", "trading", Duration::hours(1));

    // Nothing here may panic or propagate the storage error
    svc.track_view(&p).await;
    svc.track_like(&p).await;
    svc.track_unlike("p").await;
    svc.clear_history().await;
    svc.track_save(&p).await;

    assert_eq!(svc.get_engagement_stats().saves, 1);
    assert_eq!(svc.get_preferred_track(), Some(Track::Trading));
    assert_eq!(
        svc.get_for_you_posts(std::slice::from_ref(&p), &ForYouOptions::with_limit(5))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_empty_candidates_yield_empty_feeds() {
    let svc = fresh_service().await;
    let source = post("src", "trading", Duration::zero());

    assert!(svc
        .get_for_you_posts(&[], &ForYouOptions::default())
        .is_empty());
    assert!(svc.get_trending_posts(&[], 10).is_empty());
    assert!(svc.get_track_posts(&[], Track::Trading, 10).is_empty());
    assert!(svc
        .get_following_posts(&[], &HashSet::new(), 10)
        .is_empty());
    assert!(svc.get_similar_posts(&source, &[], 10).is_empty());
}
