// ============================================
// Feed Composer
// ============================================
//
// Stateless feed variants over a candidate list and an affinity snapshot:
// - for you:   personalized score + score-biased shuffle (cold start: newest first)
// - trending:  last 7 days, 2 × likes + 3 × comments
// - track:     classified track only, 0.3 × engagement + 0.7 × created_at(ms)
// - following: followed authors only, newest first
// - similar:   category / track / author / recency bonuses vs. a source post
//
// Limits are applied after the final ordering, never before.

use crate::models::{ForYouOptions, Post, ScoredPost, Track};
use crate::services::history::EngagementSnapshot;
use crate::services::scoring::ScoringEngine;
use crate::utils::{linear_decay, RandomSource};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

pub const TRENDING_WINDOW_DAYS: i64 = 7;
/// Upper bound of the random jitter added to for-you scores
pub const SHUFFLE_JITTER: f64 = 15.0;
/// Candidate pool kept before the biased shuffle, as a multiple of `limit`
pub const SHUFFLE_POOL_FACTOR: usize = 2;

pub const SIMILAR_CATEGORY_BONUS: f64 = 15.0;
pub const SIMILAR_TRACK_BONUS: f64 = 10.0;
pub const SIMILAR_AUTHOR_BONUS: f64 = 8.0;
pub const SIMILAR_RECENCY_BONUS: f64 = 5.0;
pub const SIMILAR_RECENCY_WINDOW_DAYS: f64 = 10.0;

const TRACK_ENGAGEMENT_BLEND: f64 = 0.3;
const TRACK_RECENCY_BLEND: f64 = 0.7;

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

pub struct FeedComposer<'a> {
    scoring: &'a ScoringEngine,
    random: &'a RandomSource,
    now: DateTime<Utc>,
}

impl<'a> FeedComposer<'a> {
    pub fn new(scoring: &'a ScoringEngine, random: &'a RandomSource, now: DateTime<Utc>) -> Self {
        Self {
            scoring,
            random,
            now,
        }
    }

    pub fn for_you(
        &self,
        posts: &[Post],
        snapshot: &EngagementSnapshot,
        options: &ForYouOptions,
    ) -> Vec<ScoredPost> {
        let candidates: Vec<&Post> = posts
            .iter()
            .filter(|p| !options.exclude_ids.contains(&p.id))
            .collect();

        if candidates.is_empty() || options.limit == 0 {
            return Vec::new();
        }

        if snapshot.views.is_empty() {
            return self.cold_start(candidates, options.limit);
        }

        let recent_views = snapshot.last_viewed();
        let mut scored: Vec<ScoredPost> = candidates
            .into_iter()
            .map(|post| {
                let score = self
                    .scoring
                    .score(post, &snapshot.affinity, &recent_views, self.now);
                ScoredPost::new(post.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| desc(a.score, b.score));
        scored.truncate(options.limit.saturating_mul(SHUFFLE_POOL_FACTOR));

        let mut jittered: Vec<(f64, ScoredPost)> = scored
            .into_iter()
            .map(|sp| (sp.score + self.random.next_unit() * SHUFFLE_JITTER, sp))
            .collect();
        jittered.sort_by(|a, b| desc(a.0, b.0));

        let feed: Vec<ScoredPost> = jittered
            .into_iter()
            .take(options.limit)
            .map(|(_, sp)| sp)
            .collect();

        debug!(
            candidates = posts.len(),
            returned = feed.len(),
            top_score = feed.first().map(|sp| sp.score),
            "For-you feed composed"
        );

        feed
    }

    /// No affinity signal yet: newest first, random order among equal timestamps.
    fn cold_start(&self, mut candidates: Vec<&Post>, limit: usize) -> Vec<ScoredPost> {
        self.random.shuffle(&mut candidates);
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(
            candidates = candidates.len(),
            limit = limit,
            "Cold start for-you feed"
        );

        candidates
            .into_iter()
            .take(limit)
            .map(|post| ScoredPost::new(post.clone(), 0.0))
            .collect()
    }

    pub fn trending(&self, posts: &[Post], limit: usize) -> Vec<Post> {
        let cutoff = self.now - Duration::days(TRENDING_WINDOW_DAYS);

        let mut recent: Vec<(f64, &Post)> = posts
            .iter()
            .filter(|p| p.created_at >= cutoff)
            .map(|p| (Self::trending_score(p), p))
            .collect();
        recent.sort_by(|a, b| desc(a.0, b.0));

        recent
            .into_iter()
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn trending_score(post: &Post) -> f64 {
        2.0 * post.like_count as f64 + 3.0 * post.comment_count as f64
    }

    pub fn track(&self, posts: &[Post], track: Track, limit: usize) -> Vec<Post> {
        let classifier = self.scoring.classifier();

        let mut matching: Vec<(f64, &Post)> = posts
            .iter()
            .filter(|p| classifier.classify(p) == Some(track))
            .map(|p| (Self::track_sort_key(p), p))
            .collect();
        matching.sort_by(|a, b| desc(a.0, b.0));

        matching
            .into_iter()
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// The timestamp term is in epoch milliseconds and therefore dominates;
    /// engagement only separates posts created within the same instant.
    pub fn track_sort_key(post: &Post) -> f64 {
        let engagement = post.like_count as f64 + post.comment_count as f64;
        TRACK_ENGAGEMENT_BLEND * engagement
            + TRACK_RECENCY_BLEND * post.created_at.timestamp_millis() as f64
    }

    pub fn following(
        &self,
        posts: &[Post],
        following_ids: &HashSet<String>,
        limit: usize,
    ) -> Vec<Post> {
        let mut followed: Vec<&Post> = posts
            .iter()
            .filter(|p| {
                p.author_id
                    .as_ref()
                    .is_some_and(|author| following_ids.contains(author))
            })
            .collect();
        followed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        followed.into_iter().take(limit).cloned().collect()
    }

    pub fn similar_to(&self, source: &Post, posts: &[Post], limit: usize) -> Vec<ScoredPost> {
        let classifier = self.scoring.classifier();
        let source_track = classifier.classify(source);

        let mut scored: Vec<ScoredPost> = posts
            .iter()
            .filter(|p| p.id != source.id)
            .map(|candidate| {
                let mut score = 0.0;
                if same_value(&source.category, &candidate.category) {
                    score += SIMILAR_CATEGORY_BONUS;
                }
                if source_track.is_some() && classifier.classify(candidate) == source_track {
                    score += SIMILAR_TRACK_BONUS;
                }
                if same_value(&source.author_id, &candidate.author_id) {
                    score += SIMILAR_AUTHOR_BONUS;
                }
                score += linear_decay(candidate.age_days(self.now), SIMILAR_RECENCY_WINDOW_DAYS)
                    * SIMILAR_RECENCY_BONUS;
                ScoredPost::new(candidate.clone(), score)
            })
            .collect();

        scored.sort_by(|a, b| desc(a.score, b.score));
        scored.truncate(limit);
        scored
    }
}

/// Both present and equal; two missing values are not a match.
fn same_value(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}
