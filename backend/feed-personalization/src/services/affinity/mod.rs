// ============================================
// Affinity Accumulator
// ============================================
//
// Lifetime interest signal per category / author / track.
// Additive only: removing a like or save never decrements a score.
// No decay here; freshness is handled on post age at scoring time.

use crate::models::{EngagementEvent, EventKind, Track, TrackScores};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub const VIEW_WEIGHT: f64 = 1.0;
pub const LIKE_WEIGHT: f64 = 5.0;
pub const SAVE_WEIGHT: f64 = 4.0;

/// Per-event-kind increment applied to every affinity map.
pub fn event_weight(kind: EventKind) -> f64 {
    match kind {
        EventKind::View => VIEW_WEIGHT,
        EventKind::Like => LIKE_WEIGHT,
        EventKind::Save => SAVE_WEIGHT,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityMaps {
    pub category_scores: HashMap<String, f64>,
    pub author_scores: HashMap<String, f64>,
    pub track_scores: TrackScores,
}

impl AffinityMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one appended event into the maps.
    pub fn accumulate(&mut self, kind: EventKind, event: &EngagementEvent) {
        let weight = event_weight(kind);

        if let Some(category) = event.category.as_deref().filter(|c| !c.is_empty()) {
            *self.category_scores.entry(category.to_string()).or_insert(0.0) += weight;
        }
        if let Some(author) = event.author_id.as_deref().filter(|a| !a.is_empty()) {
            *self.author_scores.entry(author.to_string()).or_insert(0.0) += weight;
        }
        if let Some(track) = event.track {
            self.track_scores.add(track, weight);
        }

        debug!(
            post_id = %event.post_id,
            kind = kind.as_str(),
            weight = weight,
            "Affinity accumulated"
        );
    }

    pub fn category(&self, category: Option<&str>) -> f64 {
        category
            .and_then(|c| self.category_scores.get(c))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn author(&self, author_id: Option<&str>) -> f64 {
        author_id
            .and_then(|a| self.author_scores.get(a))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn track(&self, track: Option<Track>) -> f64 {
        track.map(|t| self.track_scores.get(t)).unwrap_or(0.0)
    }

    pub fn top_categories(&self, n: usize) -> Vec<String> {
        top_keys(&self.category_scores, n)
    }

    pub fn top_authors(&self, n: usize) -> Vec<String> {
        top_keys(&self.author_scores, n)
    }

    pub fn is_empty(&self) -> bool {
        self.category_scores.is_empty()
            && self.author_scores.is_empty()
            && self.track_scores == TrackScores::default()
    }
}

/// Keys by descending score; equal scores fall back to key order.
fn top_keys(scores: &HashMap<String, f64>, n: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &f64)> = scores.iter().collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}
