pub mod affinity;
pub mod content_classifier;
pub mod feed;
pub mod history;
pub mod recommendation;
pub mod scoring;

pub use affinity::AffinityMaps;
pub use content_classifier::TrackClassifier;
pub use feed::FeedComposer;
pub use history::{EngagementSnapshot, EventHistoryStore, HistoryRepository};
pub use recommendation::RecommendationService;
pub use scoring::{ScoreBreakdown, ScoringEngine};
