use crate::storage::AffinityStore;
use crate::types::Result;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Maintains running like/hide counters per (user, source) and turns them
/// into the normalized affinity the scoring engine consumes. Counter
/// mutations are atomic at the storage layer so rapid toggling cannot lose
/// updates; decrements floor at zero.
#[derive(Clone)]
pub struct AffinityTracker {
    store: Arc<dyn AffinityStore>,
}

impl AffinityTracker {
    pub fn new(store: Arc<dyn AffinityStore>) -> Self {
        Self { store }
    }

    pub async fn record_like(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.store.increment_like(user_id, source_name).await
    }

    pub async fn retract_like(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.store.decrement_like(user_id, source_name).await
    }

    pub async fn record_hide(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.store.increment_hide(user_id, source_name).await
    }

    pub async fn retract_hide(&self, user_id: Uuid, source_name: &str) -> Result<()> {
        self.store.decrement_hide(user_id, source_name).await
    }

    /// Affinity for one (user, source) pair in [0, 1]; exactly 0.5 with no
    /// history.
    pub async fn affinity(&self, user_id: Uuid, source_name: &str) -> Result<f64> {
        let (likes, hides) = self.store.counts(user_id, source_name).await?;
        Ok(normalized_affinity(likes, hides))
    }

    /// Normalized affinities for every source the user has history with.
    pub async fn affinity_map(&self, user_id: Uuid) -> Result<HashMap<String, f64>> {
        let counts = self.store.counts_map(user_id).await?;
        Ok(counts
            .into_iter()
            .map(|(source, (likes, hides))| (source, normalized_affinity(likes, hides)))
            .collect())
    }
}

/// Map like/hide counts to [0, 1]. The raw ratio `(likes - hides) / total`
/// lives in [-1, 1]; `(raw + 1) / 2` shifts it so that no history is exactly
/// neutral (0.5).
pub fn normalized_affinity(likes: i64, hides: i64) -> f64 {
    let total = likes + hides;
    let raw = if total > 0 {
        (likes - hides) as f64 / total as f64
    } else {
        0.0
    };
    (raw + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_is_neutral() {
        assert_eq!(normalized_affinity(0, 0), 0.5);
    }

    #[test]
    fn all_likes_maxes_out() {
        assert_eq!(normalized_affinity(5, 0), 1.0);
    }

    #[test]
    fn all_hides_bottoms_out() {
        assert_eq!(normalized_affinity(0, 7), 0.0);
    }

    #[test]
    fn stays_within_unit_interval() {
        for likes in 0..20 {
            for hides in 0..20 {
                let affinity = normalized_affinity(likes, hides);
                assert!((0.0..=1.0).contains(&affinity), "({likes}, {hides}) -> {affinity}");
            }
        }
    }
}
