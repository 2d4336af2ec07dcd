// ============================================
// Track Classifier
// ============================================
//
// Maps a post onto one of the topical tracks:
// 1. Category lookup (authoritative, returns immediately)
// 2. Keyword occurrence counting over title + content + category
//
// Unclassified posts are excluded from track affinity but stay eligible
// for every other feed.

use crate::models::{Post, Track};

/// Static vocabulary for one track.
#[derive(Debug, Clone)]
pub struct TrackProfile {
    pub track: Track,
    /// Category names that map straight onto the track
    pub categories: &'static [&'static str],
    /// Keywords counted in the post text
    pub keywords: &'static [&'static str],
}

const TRADING: TrackProfile = TrackProfile {
    track: Track::Trading,
    categories: &["trading", "markets", "stocks", "crypto", "forex", "investing"],
    keywords: &[
        "trade", "stock", "market", "crypto", "bitcoin", "forex", "chart", "invest",
        "portfolio", "options", "futures", "profit", "bull", "bear",
    ],
};

const WELLNESS: TrackProfile = TrackProfile {
    track: Track::Wellness,
    categories: &["wellness", "health", "fitness", "mindfulness", "meditation", "nutrition"],
    keywords: &[
        "wellness", "health", "meditat", "mindful", "yoga", "sleep", "breath", "fitness",
        "nutrition", "stress", "anxiety", "workout", "self-care",
    ],
};

const INTEGRATION: TrackProfile = TrackProfile {
    track: Track::Integration,
    categories: &["integration", "psychedelics", "ceremony", "retreat"],
    keywords: &[
        "integration", "integrate", "ceremony", "journey", "retreat", "plant medicine",
        "psychedelic", "psilocybin", "ayahuasca", "shadow work", "insight",
    ],
};

/// Classifies posts into tracks.
///
/// Profiles are checked in declaration order (trading, wellness, integration),
/// which is also the tie-break when two tracks share the highest keyword count.
#[derive(Debug, Clone)]
pub struct TrackClassifier {
    profiles: Vec<TrackProfile>,
}

impl Default for TrackClassifier {
    fn default() -> Self {
        Self {
            profiles: vec![TRADING, WELLNESS, INTEGRATION],
        }
    }
}

impl TrackClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, post: &Post) -> Option<Track> {
        if let Some(track) = post.category.as_deref().and_then(|c| self.match_category(c)) {
            return Some(track);
        }

        let haystack = Self::haystack(post);
        let mut best: Option<(Track, usize)> = None;

        for profile in &self.profiles {
            let count = Self::count_keywords(&haystack, profile.keywords);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((profile.track, count)),
            }
        }

        best.map(|(track, _)| track)
    }

    /// Exact or substring match of the category against each track's table.
    fn match_category(&self, category: &str) -> Option<Track> {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return None;
        }

        self.profiles
            .iter()
            .find(|profile| {
                profile
                    .categories
                    .iter()
                    .any(|known| category == *known || category.contains(known))
            })
            .map(|profile| profile.track)
    }

    fn haystack(post: &Post) -> String {
        let mut text = String::with_capacity(post.title.len() + post.content.len() + 32);
        text.push_str(&post.title);
        text.push(' ');
        text.push_str(&post.content);
        if let Some(category) = &post.category {
            text.push(' ');
            text.push_str(category);
        }
        text.to_lowercase()
    }

    /// Total non-overlapping occurrences of every keyword.
    fn count_keywords(haystack: &str, keywords: &[&str]) -> usize {
        keywords
            .iter()
            .map(|keyword| haystack.matches(keyword).count())
            .sum()
    }
}
