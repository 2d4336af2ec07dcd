// ============================================
// Scoring Engine
// ============================================
//
// Additive, explainable per-post score:
//   category affinity × 2
// + author affinity   × 2.5
// + track affinity    × 3
// + recency           max(0, (14 - age_days) / 14) × 10 × 1.5
// + engagement        min(likes + 2 × comments, 50) × 1.2 × 0.5
// then × repetition multiplier (0.3 if viewed < 24h ago, 0.6 if < 72h).
//
// All constants are fixed contract values.

use crate::models::{Post, MILLIS_PER_HOUR};
use crate::services::affinity::AffinityMaps;
use crate::services::content_classifier::TrackClassifier;
use crate::utils::linear_decay;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const CATEGORY_WEIGHT: f64 = 2.0;
pub const AUTHOR_WEIGHT: f64 = 2.5;
pub const TRACK_WEIGHT: f64 = 3.0;
pub const RECENCY_WEIGHT: f64 = 1.5;
pub const ENGAGEMENT_WEIGHT: f64 = 1.2;

pub const RECENCY_WINDOW_DAYS: f64 = 14.0;
pub const RECENCY_SCALE: f64 = 10.0;
pub const ENGAGEMENT_CAP: f64 = 50.0;
pub const ENGAGEMENT_SCALE: f64 = 0.5;

pub const VIEWED_WITHIN_DAY_MULTIPLIER: f64 = 0.3;
pub const VIEWED_WITHIN_THREE_DAYS_MULTIPLIER: f64 = 0.6;
const DAY_HOURS: f64 = 24.0;
const THREE_DAYS_HOURS: f64 = 72.0;

/// Most recent view time (epoch ms) keyed by post id.
pub type RecentViews<'a> = HashMap<&'a str, i64>;

/// Every term of a post's score, for debugging and explanation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub category: f64,
    pub author: f64,
    pub track: f64,
    pub recency: f64,
    pub engagement: f64,
    pub repetition_multiplier: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    /// Sum of the additive terms, before the repetition multiplier.
    pub fn base(&self) -> f64 {
        self.category + self.author + self.track + self.recency + self.engagement
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    classifier: TrackClassifier,
}

impl ScoringEngine {
    pub fn new(classifier: TrackClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &TrackClassifier {
        &self.classifier
    }

    pub fn score(
        &self,
        post: &Post,
        affinity: &AffinityMaps,
        recent_views: &RecentViews<'_>,
        now: DateTime<Utc>,
    ) -> f64 {
        self.explain(post, affinity, recent_views, now).total
    }

    pub fn explain(
        &self,
        post: &Post,
        affinity: &AffinityMaps,
        recent_views: &RecentViews<'_>,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let category = affinity.category(post.category.as_deref()) * CATEGORY_WEIGHT;
        let author = affinity.author(post.author_id.as_deref()) * AUTHOR_WEIGHT;
        let track = affinity.track(self.classifier.classify(post)) * TRACK_WEIGHT;
        let recency = Self::recency_term(post, now);
        let engagement = Self::engagement_term(post);
        let repetition_multiplier = Self::repetition_multiplier(post, recent_views, now);

        let mut breakdown = ScoreBreakdown {
            category,
            author,
            track,
            recency,
            engagement,
            repetition_multiplier,
            total: 0.0,
        };
        breakdown.total = breakdown.base() * repetition_multiplier;

        debug!(
            post_id = %post.id,
            category = category,
            author = author,
            track = track,
            recency = recency,
            engagement = engagement,
            repetition = repetition_multiplier,
            score = breakdown.total,
            "Post scored"
        );

        breakdown
    }

    /// Linear freshness over a 14-day window, maximum 15.
    pub fn recency_term(post: &Post, now: DateTime<Utc>) -> f64 {
        linear_decay(post.age_days(now), RECENCY_WINDOW_DAYS) * RECENCY_SCALE * RECENCY_WEIGHT
    }

    /// Capped popularity, maximum 30.
    pub fn engagement_term(post: &Post) -> f64 {
        let raw = post.like_count as f64 + 2.0 * post.comment_count as f64;
        raw.min(ENGAGEMENT_CAP) * ENGAGEMENT_WEIGHT * ENGAGEMENT_SCALE
    }

    pub fn repetition_multiplier(
        post: &Post,
        recent_views: &RecentViews<'_>,
        now: DateTime<Utc>,
    ) -> f64 {
        let Some(&viewed_at) = recent_views.get(post.id.as_str()) else {
            return 1.0;
        };

        let hours_since = (now.timestamp_millis() - viewed_at) as f64 / MILLIS_PER_HOUR;
        if hours_since < DAY_HOURS {
            VIEWED_WITHIN_DAY_MULTIPLIER
        } else if hours_since < THREE_DAYS_HOURS {
            VIEWED_WITHIN_THREE_DAYS_MULTIPLIER
        } else {
            1.0
        }
    }
}
