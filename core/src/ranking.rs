//! Post-retrieval threshold cut and boosting.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::{Entry, SearchMetadata};

pub const DEFAULT_THRESHOLD: f32 = 0.7;

const RECENCY_DECAY_PER_DAY: f64 = 0.1;
const RECENCY_SCALE: f32 = 0.1;
const PREFERENCE_SCALE: f32 = 0.1;
const MAX_SIMILARITY: f32 = 1.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoostOptions {
    pub boost_recent: bool,
    pub boost_preferences: bool,
}

impl BoostOptions {
    pub fn any(&self) -> bool {
        self.boost_recent || self.boost_preferences
    }
}

/// Signals the ranking engine reads from a search hit.
pub trait Rankable {
    /// `None` is treated as maximally stale.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// `None` falls back to `SearchMetadata::default()`.
    fn search_metadata(&self) -> Option<&SearchMetadata>;
}

impl Rankable for Entry {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn search_metadata(&self) -> Option<&SearchMetadata> {
        Some(&self.search_metadata)
    }
}

/// A raw hit from the similarity collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub item: T,
    pub similarity: f32,
}

impl<T> Candidate<T> {
    pub fn new(item: T, similarity: f32) -> Self {
        Self { item, similarity }
    }
}

impl<T> From<(T, f32)> for Candidate<T> {
    fn from((item, similarity): (T, f32)) -> Self {
        Self::new(item, similarity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit<T> {
    #[serde(flatten)]
    pub item: T,
    /// Score after boosting; equal to `original_similarity` when no boost ran.
    pub similarity: f32,
    pub original_similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResults<T> {
    pub results: Vec<RankedHit<T>>,
    pub count: usize,
    pub threshold: f32,
}

/// Ranks `candidates` against the current wall clock.
pub fn rank_now<T: Rankable>(
    candidates: Vec<Candidate<T>>,
    threshold: f32,
    options: BoostOptions,
) -> RankedResults<T> {
    rank(candidates, threshold, options, Utc::now())
}

/// Drops candidates below `threshold` and, when a boost is requested,
/// re-scores and re-sorts the survivors. Without boosts the input order is
/// kept as-is.
pub fn rank<T: Rankable>(
    candidates: Vec<Candidate<T>>,
    threshold: f32,
    options: BoostOptions,
    now: DateTime<Utc>,
) -> RankedResults<T> {
    // NaN similarities fail the comparison and are dropped too.
    let mut results: Vec<RankedHit<T>> = candidates
        .into_iter()
        .filter(|candidate| candidate.similarity >= threshold)
        .map(|candidate| {
            let similarity = if options.any() {
                boosted_similarity(&candidate, options, now)
            } else {
                candidate.similarity
            };
            RankedHit {
                original_similarity: candidate.similarity,
                similarity,
                item: candidate.item,
            }
        })
        .collect();

    if options.any() {
        // Stable: equal scores keep their retrieval order.
        results.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
    }

    RankedResults {
        count: results.len(),
        results,
        threshold,
    }
}

fn boosted_similarity<T: Rankable>(
    candidate: &Candidate<T>,
    options: BoostOptions,
    now: DateTime<Utc>,
) -> f32 {
    let metadata = candidate
        .item
        .search_metadata()
        .copied()
        .unwrap_or_default();

    let mut adjusted = candidate.similarity;
    if options.boost_recent {
        adjusted += recency_boost(candidate.item.created_at(), metadata.recency_weight, now)
            * RECENCY_SCALE;
    }
    if options.boost_preferences {
        adjusted += metadata.user_preference_alignment * PREFERENCE_SCALE;
    }
    if metadata.boost_factor != 1.0 {
        adjusted *= metadata.boost_factor;
    }

    adjusted.min(MAX_SIMILARITY)
}

/// `exp(-0.1 * age_days) * recency_weight`, with future timestamps treated
/// as age zero and a missing timestamp contributing nothing.
pub fn recency_boost(
    created_at: Option<DateTime<Utc>>,
    recency_weight: f32,
    now: DateTime<Utc>,
) -> f32 {
    let Some(created_at) = created_at else {
        return 0.0;
    };
    let age_seconds = (now - created_at).num_milliseconds().max(0) as f64 / 1_000.0;
    let age_days = age_seconds / SECONDS_PER_DAY;
    ((-RECENCY_DECAY_PER_DAY * age_days).exp() as f32) * recency_weight
}
