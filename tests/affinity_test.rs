//! Affinity tracker: counter semantics and normalization bounds.

mod common;

use common::MemAffinityStore;
use feedjam::AffinityTracker;
use std::sync::Arc;
use uuid::Uuid;

const EPSILON: f64 = 1e-9;

#[tokio::test]
async fn zero_history_is_exactly_neutral() {
    let tracker = AffinityTracker::new(Arc::new(MemAffinityStore::new()));
    let user = Uuid::new_v4();

    let affinity = tracker.affinity(user, "never-seen").await.unwrap();
    assert_eq!(affinity, 0.5);
}

#[tokio::test]
async fn likes_raise_and_hides_lower_affinity() {
    let tracker = AffinityTracker::new(Arc::new(MemAffinityStore::new()));
    let user = Uuid::new_v4();

    tracker.record_like(user, "good").await.unwrap();
    tracker.record_like(user, "good").await.unwrap();
    assert_eq!(tracker.affinity(user, "good").await.unwrap(), 1.0);

    tracker.record_hide(user, "bad").await.unwrap();
    tracker.record_hide(user, "bad").await.unwrap();
    assert_eq!(tracker.affinity(user, "bad").await.unwrap(), 0.0);

    // 3 likes, 1 hide: raw = 2/4 = 0.5, normalized = 0.75.
    tracker.record_like(user, "mixed").await.unwrap();
    tracker.record_like(user, "mixed").await.unwrap();
    tracker.record_like(user, "mixed").await.unwrap();
    tracker.record_hide(user, "mixed").await.unwrap();
    let affinity = tracker.affinity(user, "mixed").await.unwrap();
    assert!((affinity - 0.75).abs() < EPSILON, "got {affinity}");
}

#[tokio::test]
async fn retract_floors_at_zero() {
    let tracker = AffinityTracker::new(Arc::new(MemAffinityStore::new()));
    let user = Uuid::new_v4();

    // Retracting with no prior likes must not go negative.
    tracker.retract_like(user, "src").await.unwrap();
    tracker.retract_hide(user, "src").await.unwrap();
    assert_eq!(tracker.affinity(user, "src").await.unwrap(), 0.5);

    tracker.record_like(user, "src").await.unwrap();
    tracker.retract_like(user, "src").await.unwrap();
    tracker.retract_like(user, "src").await.unwrap();
    assert_eq!(tracker.affinity(user, "src").await.unwrap(), 0.5);
}

#[tokio::test]
async fn affinity_stays_in_unit_interval() {
    let tracker = AffinityTracker::new(Arc::new(MemAffinityStore::new()));
    let user = Uuid::new_v4();

    for i in 0..10 {
        if i % 3 == 0 {
            tracker.record_hide(user, "src").await.unwrap();
        } else {
            tracker.record_like(user, "src").await.unwrap();
        }
        let affinity = tracker.affinity(user, "src").await.unwrap();
        assert!((0.0..=1.0).contains(&affinity), "got {affinity}");
    }
}

#[tokio::test]
async fn affinity_map_covers_only_touched_sources() {
    let tracker = AffinityTracker::new(Arc::new(MemAffinityStore::new()));
    let user = Uuid::new_v4();
    let other_user = Uuid::new_v4();

    tracker.record_like(user, "a").await.unwrap();
    tracker.record_hide(user, "b").await.unwrap();
    tracker.record_like(other_user, "c").await.unwrap();

    let map = tracker.affinity_map(user).await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["a"], 1.0);
    assert_eq!(map["b"], 0.0);
    assert!(!map.contains_key("c"));
}
