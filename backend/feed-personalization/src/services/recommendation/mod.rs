// ============================================
// Recommendation Service
// ============================================
//
// One instance per device/user context. Owns the engagement history and
// affinity maps exclusively; everything is injected (store, clock, random
// source) so parallel instances never share state.
//
// Mutating operations take `&mut self` and persist before returning.
// Feed operations take `&self` and only read the in-memory snapshot.

use crate::config::{KeyspaceConfig, PersonalizationConfig};
use crate::models::{EngagementStats, EventKind, ForYouOptions, Post, ScoredPost, Track, UserProfile};
use crate::services::content_classifier::TrackClassifier;
use crate::services::feed::FeedComposer;
use crate::services::history::{EventHistoryStore, HistoryRepository};
use crate::services::scoring::{ScoreBreakdown, ScoringEngine};
use crate::storage::{self, KeyValueStore, StorageError};
use crate::utils::{Clock, RandomSource, SystemClock};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub const TOP_CATEGORIES: usize = 5;
pub const TOP_AUTHORS: usize = 10;

pub struct RecommendationService {
    history: EventHistoryStore,
    scoring: ScoringEngine,
    clock: Arc<dyn Clock>,
    random: RandomSource,
}

impl RecommendationService {
    /// Load persisted state from `store`. Unreadable state starts empty.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        keyspace: KeyspaceConfig,
        clock: Arc<dyn Clock>,
        random: RandomSource,
    ) -> Self {
        let repository = HistoryRepository::new(store, keyspace);
        let history = EventHistoryStore::load(repository).await;

        Self {
            history,
            scoring: ScoringEngine::new(TrackClassifier::new()),
            clock,
            random,
        }
    }

    /// Open the configured store and load state with the system clock.
    pub async fn from_config(config: &PersonalizationConfig) -> Result<Self, StorageError> {
        let store = storage::connect(&config.store).await?;
        let random = match config.random_seed {
            Some(seed) => RandomSource::seeded(seed),
            None => RandomSource::from_entropy(),
        };

        Ok(Self::load(store, config.keyspace.clone(), Arc::new(SystemClock), random).await)
    }

    fn composer(&self) -> FeedComposer<'_> {
        FeedComposer::new(&self.scoring, &self.random, self.clock.now())
    }

    // ============================================
    // Engagement tracking
    // ============================================

    pub async fn track_view(&mut self, post: &Post) {
        self.track(EventKind::View, post).await;
    }

    pub async fn track_like(&mut self, post: &Post) {
        self.track(EventKind::Like, post).await;
    }

    pub async fn track_save(&mut self, post: &Post) {
        self.track(EventKind::Save, post).await;
    }

    async fn track(&mut self, kind: EventKind, post: &Post) {
        let track = self.scoring.classifier().classify(post);
        let now = self.clock.now();
        match kind {
            EventKind::View => self.history.record_view(post, track, now),
            EventKind::Like => self.history.record_like(post, track, now),
            EventKind::Save => self.history.record_save(post, track, now),
        }
        self.history.persist().await;
    }

    pub async fn track_unlike(&mut self, post_id: &str) {
        if self.history.remove_like(post_id) {
            self.history.persist().await;
        }
    }

    pub async fn track_unsave(&mut self, post_id: &str) {
        if self.history.remove_save(post_id) {
            self.history.persist().await;
        }
    }

    /// Reset every persisted key to its empty default (logout / privacy reset).
    pub async fn clear_history(&mut self) {
        self.history.clear();
        self.history.persist().await;
        info!("Engagement history cleared");
    }

    // ============================================
    // Feeds
    // ============================================

    pub fn get_for_you_posts(&self, all_posts: &[Post], options: &ForYouOptions) -> Vec<ScoredPost> {
        self.composer()
            .for_you(all_posts, self.history.snapshot(), options)
    }

    pub fn get_trending_posts(&self, all_posts: &[Post], limit: usize) -> Vec<Post> {
        self.composer().trending(all_posts, limit)
    }

    pub fn get_track_posts(&self, all_posts: &[Post], track: Track, limit: usize) -> Vec<Post> {
        self.composer().track(all_posts, track, limit)
    }

    pub fn get_following_posts(
        &self,
        all_posts: &[Post],
        following_ids: &HashSet<String>,
        limit: usize,
    ) -> Vec<Post> {
        self.composer().following(all_posts, following_ids, limit)
    }

    pub fn get_similar_posts(&self, post: &Post, all_posts: &[Post], limit: usize) -> Vec<ScoredPost> {
        self.composer().similar_to(post, all_posts, limit)
    }

    /// Personalized score of one post with each term broken out.
    pub fn explain_score(&self, post: &Post) -> ScoreBreakdown {
        let snapshot = self.history.snapshot();
        let recent_views = snapshot.last_viewed();
        self.scoring
            .explain(post, &snapshot.affinity, &recent_views, self.clock.now())
    }

    // ============================================
    // Profile accessors
    // ============================================

    pub fn get_preferred_track(&self) -> Option<Track> {
        self.history.snapshot().affinity.track_scores.preferred()
    }

    pub fn get_engagement_stats(&self) -> EngagementStats {
        let snapshot = self.history.snapshot();
        EngagementStats {
            views: snapshot.views.len(),
            likes: snapshot.likes.len(),
            saves: snapshot.saves.len(),
            preferred_track: self.get_preferred_track(),
        }
    }

    pub fn get_user_profile(&self) -> UserProfile {
        let snapshot = self.history.snapshot();
        UserProfile {
            view_count: snapshot.views.len(),
            like_count: snapshot.likes.len(),
            save_count: snapshot.saves.len(),
            top_categories: snapshot.affinity.top_categories(TOP_CATEGORIES),
            top_authors: snapshot.affinity.top_authors(TOP_AUTHORS),
            preferred_track: snapshot.affinity.track_scores.preferred(),
            track_scores: snapshot.affinity.track_scores,
        }
    }

    pub fn is_liked(&self, post_id: &str) -> bool {
        self.history.snapshot().contains(EventKind::Like, post_id)
    }

    pub fn is_saved(&self, post_id: &str) -> bool {
        self.history.snapshot().contains(EventKind::Save, post_id)
    }

    pub fn history(&self) -> &EventHistoryStore {
        &self.history
    }
}
