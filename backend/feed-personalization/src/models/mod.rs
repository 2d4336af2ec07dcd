use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Topical cluster used for coarse personalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Trading,
    Wellness,
    Integration,
}

impl Track {
    /// Declaration order doubles as the tie-break order everywhere tracks compete.
    pub const ALL: [Track; 3] = [Track::Trading, Track::Wellness, Track::Integration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Trading => "trading",
            Track::Wellness => "wellness",
            Track::Integration => "integration",
        }
    }

    pub fn parse(value: &str) -> Option<Track> {
        Track::ALL
            .into_iter()
            .find(|track| track.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate post as delivered by the content source. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Missing timestamps fall back to the Unix epoch, which zeroes recency.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
}

impl Post {
    /// Age in fractional days relative to `now`. Future timestamps yield 0.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let age_ms = (now - self.created_at).num_milliseconds().max(0) as f64;
        age_ms / MILLIS_PER_DAY
    }
}

/// Parse a JSON array of candidates. Entries that do not form a post are
/// skipped with a warning; only a non-array document is an error.
pub fn parse_posts(raw: &str) -> serde_json::Result<Vec<Post>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let posts = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(index = index, error = %e, "Skipping malformed post");
                None
            }
        })
        .collect();
    Ok(posts)
}

pub(crate) const MILLIS_PER_HOUR: f64 = 3_600_000.0;
pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Like,
    Save,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Like => "like",
            EventKind::Save => "save",
        }
    }
}

/// One recorded engagement. Category and track are frozen at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEvent {
    pub post_id: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub track: Option<Track>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// A post with its ranking score attached. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: Post,
    pub score: f64,
}

impl ScoredPost {
    pub fn new(post: Post, score: f64) -> Self {
        Self { post, score }
    }
}

/// Per-track accumulated affinity. Always carries all three tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackScores {
    #[serde(default)]
    pub trading: f64,
    #[serde(default)]
    pub wellness: f64,
    #[serde(default)]
    pub integration: f64,
}

impl TrackScores {
    pub fn get(&self, track: Track) -> f64 {
        match track {
            Track::Trading => self.trading,
            Track::Wellness => self.wellness,
            Track::Integration => self.integration,
        }
    }

    pub fn add(&mut self, track: Track, amount: f64) {
        match track {
            Track::Trading => self.trading += amount,
            Track::Wellness => self.wellness += amount,
            Track::Integration => self.integration += amount,
        }
    }

    /// Highest-scoring track, `None` while every score is zero.
    pub fn preferred(&self) -> Option<Track> {
        let mut best: Option<(Track, f64)> = None;
        for track in Track::ALL {
            let score = self.get(track);
            if score <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((track, score)),
            }
        }
        best.map(|(track, _)| track)
    }
}

/// Derived view over history and affinity. Computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub view_count: usize,
    pub like_count: usize,
    pub save_count: usize,
    pub top_categories: Vec<String>,
    pub top_authors: Vec<String>,
    pub preferred_track: Option<Track>,
    pub track_scores: TrackScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    pub views: usize,
    pub likes: usize,
    pub saves: usize,
    pub preferred_track: Option<Track>,
}

#[derive(Debug, Clone)]
pub struct ForYouOptions {
    pub limit: usize,
    pub exclude_ids: HashSet<String>,
}

impl Default for ForYouOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            exclude_ids: HashSet::new(),
        }
    }
}

impl ForYouOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn excluding<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_ids.extend(ids.into_iter().map(Into::into));
        self
    }
}
