use anyhow::{Context, Result};
use feed_personalization::{
    parse_posts, ForYouOptions, PersonalizationConfig, Post, RecommendationService, ScoredPost,
    UserProfile,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LIMIT: usize = 20;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedPreview {
    profile: UserProfile,
    for_you: Vec<ScoredPost>,
    trending: Vec<Post>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let posts_path = args
        .next()
        .context("usage: feed-preview <posts.json> [limit]")?;
    let limit = match args.next() {
        Some(raw) => raw.parse().context("limit must be a positive integer")?,
        None => DEFAULT_LIMIT,
    };

    let config = PersonalizationConfig::from_env().context("failed to load configuration")?;
    info!(
        backend = ?config.store.backend,
        device_id = %config.keyspace.device_id,
        "Starting feed preview"
    );

    let raw = tokio::fs::read_to_string(&posts_path)
        .await
        .with_context(|| format!("failed to read {}", posts_path))?;
    let posts =
        parse_posts(&raw).with_context(|| format!("invalid posts JSON in {}", posts_path))?;

    let service = RecommendationService::from_config(&config)
        .await
        .context("failed to open personalization store")?;

    let preview = FeedPreview {
        profile: service.get_user_profile(),
        for_you: service.get_for_you_posts(&posts, &ForYouOptions::with_limit(limit)),
        trending: service.get_trending_posts(&posts, limit),
    };

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}
