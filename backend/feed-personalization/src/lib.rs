pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use config::PersonalizationConfig;
pub use models::{
    parse_posts, EngagementStats, ForYouOptions, Post, ScoredPost, Track, UserProfile,
};
pub use services::{RecommendationService, ScoreBreakdown, TrackClassifier};
pub use storage::{KeyValueStore, MemoryStore, RedisStore};
