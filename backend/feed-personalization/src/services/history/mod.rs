// ============================================
// Event History Store
// ============================================
//
// Bounded, newest-first engagement logs plus the affinity maps they feed.
//
// Lists (deduplicated by post id, most recent occurrence wins):
// - views: 200
// - likes: 100
// - saves: 50
//
// Every append also folds the event into AffinityMaps. Unlike/unsave only
// filter the corresponding list.

pub mod persistence;

pub use persistence::{HistoryRepository, PersistedKeys, SCHEMA_VERSION};

use crate::models::{EngagementEvent, EventKind, Post, Track};
use crate::services::affinity::AffinityMaps;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

pub const MAX_VIEWS: usize = 200;
pub const MAX_LIKES: usize = 100;
pub const MAX_SAVES: usize = 50;

pub fn list_cap(kind: EventKind) -> usize {
    match kind {
        EventKind::View => MAX_VIEWS,
        EventKind::Like => MAX_LIKES,
        EventKind::Save => MAX_SAVES,
    }
}

/// In-memory snapshot of everything persisted for one device context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementSnapshot {
    pub views: VecDeque<EngagementEvent>,
    pub likes: VecDeque<EngagementEvent>,
    pub saves: VecDeque<EngagementEvent>,
    pub affinity: AffinityMaps,
}

impl EngagementSnapshot {
    fn list(&self, kind: EventKind) -> &VecDeque<EngagementEvent> {
        match kind {
            EventKind::View => &self.views,
            EventKind::Like => &self.likes,
            EventKind::Save => &self.saves,
        }
    }

    fn list_mut(&mut self, kind: EventKind) -> &mut VecDeque<EngagementEvent> {
        match kind {
            EventKind::View => &mut self.views,
            EventKind::Like => &mut self.likes,
            EventKind::Save => &mut self.saves,
        }
    }

    /// Front-insert with dedup and cap, then accumulate affinity.
    pub fn append(&mut self, kind: EventKind, event: EngagementEvent) {
        self.affinity.accumulate(kind, &event);

        let cap = list_cap(kind);
        let list = self.list_mut(kind);
        list.retain(|existing| existing.post_id != event.post_id);
        list.push_front(event);
        list.truncate(cap);
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, kind: EventKind, post_id: &str) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|event| event.post_id != post_id);
        list.len() != before
    }

    pub fn contains(&self, kind: EventKind, post_id: &str) -> bool {
        self.list(kind).iter().any(|event| event.post_id == post_id)
    }

    /// Most recent view timestamp (epoch ms) per post id.
    pub fn last_viewed(&self) -> HashMap<&str, i64> {
        let mut viewed = HashMap::with_capacity(self.views.len());
        for event in &self.views {
            viewed
                .entry(event.post_id.as_str())
                .and_modify(|ts: &mut i64| *ts = (*ts).max(event.timestamp))
                .or_insert(event.timestamp);
        }
        viewed
    }
}

/// Owns the engagement snapshot and writes it through to the backing store.
pub struct EventHistoryStore {
    snapshot: EngagementSnapshot,
    repository: HistoryRepository,
}

impl EventHistoryStore {
    /// Read every persisted key. Never fails: unreadable state starts empty.
    pub async fn load(repository: HistoryRepository) -> Self {
        let snapshot = repository.load().await;
        info!(
            views = snapshot.views.len(),
            likes = snapshot.likes.len(),
            saves = snapshot.saves.len(),
            "Engagement history loaded"
        );
        Self {
            snapshot,
            repository,
        }
    }

    pub fn snapshot(&self) -> &EngagementSnapshot {
        &self.snapshot
    }

    pub fn record_view(&mut self, post: &Post, track: Option<Track>, now: DateTime<Utc>) {
        self.record(EventKind::View, post, track, now);
    }

    pub fn record_like(&mut self, post: &Post, track: Option<Track>, now: DateTime<Utc>) {
        self.record(EventKind::Like, post, track, now);
    }

    pub fn record_save(&mut self, post: &Post, track: Option<Track>, now: DateTime<Utc>) {
        self.record(EventKind::Save, post, track, now);
    }

    fn record(&mut self, kind: EventKind, post: &Post, track: Option<Track>, now: DateTime<Utc>) {
        let event = EngagementEvent {
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            category: post.category.clone(),
            track,
            timestamp: now.timestamp_millis(),
        };
        self.snapshot.append(kind, event);

        debug!(
            post_id = %post.id,
            kind = kind.as_str(),
            track = ?track,
            "Engagement recorded"
        );
    }

    pub fn remove_like(&mut self, post_id: &str) -> bool {
        self.snapshot.remove(EventKind::Like, post_id)
    }

    pub fn remove_save(&mut self, post_id: &str) -> bool {
        self.snapshot.remove(EventKind::Save, post_id)
    }

    pub fn clear(&mut self) {
        self.snapshot = EngagementSnapshot::default();
    }

    /// Write the snapshot. Failures are logged and swallowed.
    pub async fn persist(&self) {
        if let Err(e) = self.repository.persist(&self.snapshot).await {
            warn!(error = %e, "Failed to persist engagement history, continuing in memory");
        }
    }
}
