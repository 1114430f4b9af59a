use crate::types::{FeedItem, FeedJamError, Result};
use std::collections::HashMap;

/// Weights of the composite rank score. Overridable at engine construction;
/// the defaults are the production configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub interest: f64,
    pub affinity: f64,
    pub popularity: f64,
    pub recency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interest: 0.4,
            affinity: 0.3,
            popularity: 0.2,
            recency: 0.1,
        }
    }
}

/// Everything about a user the scoring engine reads. Loaded fresh from
/// storage for each regeneration; never cached across users.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    /// Lowercased topic -> weight in [0.0, 2.0].
    pub interests: HashMap<String, f64>,
    /// source_name -> affinity already normalized to [0, 1].
    pub affinities: HashMap<String, f64>,
}

impl UserProfile {
    /// A malformed profile fails the whole regeneration rather than silently
    /// producing an unranked feed.
    pub fn validate(&self) -> Result<()> {
        for (topic, weight) in &self.interests {
            if !weight.is_finite() || !(0.0..=2.0).contains(weight) {
                return Err(FeedJamError::Scoring(format!(
                    "interest weight out of range for topic '{topic}': {weight}"
                )));
            }
        }
        for (source, affinity) in &self.affinities {
            if !affinity.is_finite() || !(0.0..=1.0).contains(affinity) {
                return Err(FeedJamError::Scoring(format!(
                    "affinity out of range for source '{source}': {affinity}"
                )));
            }
        }
        Ok(())
    }
}

/// Shared normalization basis for one scoring pass. Popularity scores are
/// only comparable within the batch this was built from.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext {
    max_raw_popularity: f64,
}

impl BatchContext {
    pub fn from_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a FeedItem>,
    {
        let max_raw_popularity = items
            .into_iter()
            .map(|item| raw_popularity(item.points.unwrap_or(0), item.views.unwrap_or(0)))
            .fold(0.0_f64, f64::max);
        Self { max_raw_popularity }
    }
}

/// Log scale keeps extreme outliers from dominating while still rewarding
/// engagement.
fn raw_popularity(points: i64, views: i64) -> f64 {
    (1.0 + points.max(0) as f64).ln() + 0.5 * (1.0 + views.max(0) as f64).ln()
}

/// Extension point for time-based scoring. The current behavior is a flat
/// neutral score: items already arrive roughly time-ordered from the fetch
/// pipeline.
pub trait RecencyStrategy: Send + Sync {
    fn score(&self, item: &FeedItem) -> f64;
}

pub struct ConstantRecency(pub f64);

impl RecencyStrategy for ConstantRecency {
    fn score(&self, _item: &FeedItem) -> f64 {
        self.0
    }
}

impl Default for ConstantRecency {
    fn default() -> Self {
        Self(0.5)
    }
}

/// Computes composite rank scores for feed items against a user profile.
pub struct ScoringEngine {
    weights: ScoringWeights,
    recency: Box<dyn RecencyStrategy>,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            recency: Box::new(ConstantRecency::default()),
        }
    }

    pub fn with_recency(mut self, recency: Box<dyn RecencyStrategy>) -> Self {
        self.recency = recency;
        self
    }

    /// Composite score for a single item. All sub-scores are computed, then
    /// combined in one weighted sum. No clamping beyond what the sub-scores
    /// guarantee: an interest score above 1.0 legitimately pushes the
    /// composite above 1.0.
    pub fn score(&self, item: &FeedItem, profile: &UserProfile, ctx: &BatchContext) -> f64 {
        let interest = self.interest_score(item, &profile.interests);
        let affinity = self.affinity_score(item, &profile.affinities);
        let popularity = self.popularity_score(item, ctx);
        let recency = self.recency.score(item);

        self.weights.interest * interest
            + self.weights.affinity * affinity
            + self.weights.popularity * popularity
            + self.weights.recency * recency
    }

    /// Score a batch under one shared context, preserving input order.
    pub fn score_batch(&self, items: &[FeedItem], profile: &UserProfile) -> Vec<f64> {
        let ctx = BatchContext::from_items(items);
        items
            .iter()
            .map(|item| self.score(item, profile, &ctx))
            .collect()
    }

    /// Mean weight of the user's topics that appear in the item text,
    /// matched case-insensitively as substrings. Range [0, 2]; 0 when
    /// nothing matches.
    fn interest_score(&self, item: &FeedItem, interests: &HashMap<String, f64>) -> f64 {
        if interests.is_empty() {
            return 0.0;
        }

        let text = searchable_text(item);
        let mut total = 0.0;
        let mut matched = 0_u32;

        for (topic, weight) in interests {
            if text.contains(topic.as_str()) {
                total += weight;
                matched += 1;
            }
        }

        if matched > 0 {
            total / matched as f64
        } else {
            0.0
        }
    }

    /// Affinity from the tracker's map; 0.5 (neutral) for sources the user
    /// has no history with.
    fn affinity_score(&self, item: &FeedItem, affinities: &HashMap<String, f64>) -> f64 {
        affinities.get(&item.source_name).copied().unwrap_or(0.5)
    }

    /// Raw popularity normalized against the batch maximum. When no item in
    /// the batch has any metrics, every popularity score is 0.
    fn popularity_score(&self, item: &FeedItem, ctx: &BatchContext) -> f64 {
        if ctx.max_raw_popularity <= 0.0 {
            return 0.0;
        }
        raw_popularity(item.points.unwrap_or(0), item.views.unwrap_or(0)) / ctx.max_raw_popularity
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

fn searchable_text(item: &FeedItem) -> String {
    let mut text = item.title.clone();
    if let Some(summary) = &item.summary {
        text.push(' ');
        text.push_str(summary);
    }
    if let Some(description) = &item.description {
        text.push(' ');
        text.push_str(description);
    }
    text.to_lowercase()
}
