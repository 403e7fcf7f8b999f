//! Per-session segment bookkeeping.
//!
//! The tracker remembers every segment URL a session has ever recorded and
//! keeps a bounded, ordered window of the most recent [`SegmentStatus`]
//! values. The seen-set outlives eviction from the window, so a segment that
//! scrolled out of history is never probed or recorded again.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manifest::SegmentCandidate;

/// Outcome of probing a single segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStatus {
    /// Absolute segment URL.
    pub url: String,
    /// Manifest-declared duration in seconds (0 when unknown).
    pub duration: f64,
    /// Measured transfer time in seconds.
    pub load_time: f64,
    /// `load_time` exceeded the delay threshold.
    pub is_delayed: bool,
}

impl SegmentStatus {
    pub fn new(candidate: SegmentCandidate, load_time: Duration, delay_threshold: f64) -> Self {
        let load_time = load_time.as_secs_f64();
        Self {
            url: candidate.url,
            duration: candidate.duration,
            load_time,
            is_delayed: load_time > delay_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentTracker {
    seen: HashSet<String>,
    history: VecDeque<SegmentStatus>,
    capacity: usize,
}

impl SegmentTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::new(),
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Candidates that still need probing, in manifest order.
    ///
    /// Already-seen URLs are dropped, and a URL listed twice in the same
    /// manifest is kept only at its first position.
    pub fn unseen(&self, candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate> {
        let mut in_batch = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| !self.is_seen(&c.url) && in_batch.insert(c.url.clone()))
            .collect()
    }

    /// Append one tick's statuses in discovery order and evict the oldest
    /// entries beyond capacity.
    ///
    /// Every appended URL is marked seen, including ones evicted by this very
    /// merge. Statuses for URLs that are already seen are ignored. Returns the
    /// number of statuses appended.
    pub fn merge(&mut self, staged: Vec<SegmentStatus>) -> usize {
        let mut appended = 0;
        for status in staged {
            if !self.seen.insert(status.url.clone()) {
                continue;
            }
            self.history.push_back(status);
            appended += 1;
        }

        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        appended
    }

    pub fn snapshot(&self) -> Vec<SegmentStatus> {
        self.history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(n: usize) -> SegmentCandidate {
        SegmentCandidate {
            url: format!("https://a.com/seg{n}.ts"),
            duration: 6.0,
        }
    }

    fn status(n: usize) -> SegmentStatus {
        SegmentStatus::new(candidate(n), Duration::from_millis(100), 2.0)
    }

    #[test]
    fn test_status_delay_classification() {
        let fast = SegmentStatus::new(candidate(1), Duration::from_millis(1999), 2.0);
        assert!(!fast.is_delayed);
        let edge = SegmentStatus::new(candidate(2), Duration::from_secs(2), 2.0);
        assert!(!edge.is_delayed);
        let slow = SegmentStatus::new(candidate(3), Duration::from_millis(2001), 2.0);
        assert!(slow.is_delayed);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(status(1)).unwrap();
        assert_eq!(json["url"], "https://a.com/seg1.ts");
        assert_eq!(json["duration"], 6.0);
        assert!(json.get("loadTime").is_some());
        assert_eq!(json["isDelayed"], false);
    }

    #[test]
    fn test_unseen_filters_seen_and_batch_duplicates() {
        let mut tracker = SegmentTracker::new(10);
        tracker.merge(vec![status(1)]);

        let fresh = tracker.unseen(vec![candidate(1), candidate(2), candidate(2), candidate(3)]);
        let urls: Vec<_> = fresh.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com/seg2.ts", "https://a.com/seg3.ts"]);
    }

    #[test]
    fn test_merge_evicts_oldest_first() {
        let mut tracker = SegmentTracker::new(10);
        tracker.merge((0..10).map(status).collect());
        assert_eq!(tracker.history_len(), 10);

        tracker.merge(vec![status(10)]);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot[0].url, "https://a.com/seg1.ts");
        assert_eq!(snapshot[9].url, "https://a.com/seg10.ts");
    }

    #[test]
    fn test_evicted_segment_stays_seen() {
        let mut tracker = SegmentTracker::new(2);
        tracker.merge(vec![status(1), status(2), status(3)]);

        assert_eq!(tracker.history_len(), 2);
        assert!(tracker.is_seen("https://a.com/seg1.ts"));
        assert!(tracker.unseen(vec![candidate(1)]).is_empty());
        assert_eq!(tracker.merge(vec![status(1)]), 0);
        assert_eq!(tracker.snapshot()[0].url, "https://a.com/seg2.ts");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// Any sequence of ticks keeps history bounded, unique, ordered, and
        /// covered by the seen-set.
        #[test]
        fn prop_history_bounded_and_unique(
            ticks in prop::collection::vec(prop::collection::vec(0usize..40, 0..15), 1..20),
            capacity in 1usize..12,
        ) {
            let mut tracker = SegmentTracker::new(capacity);
            let mut recorded: Vec<String> = Vec::new();

            for tick in ticks {
                let fresh = tracker.unseen(tick.into_iter().map(candidate).collect());
                for c in &fresh {
                    prop_assert!(!recorded.contains(&c.url), "re-probed {}", c.url);
                    recorded.push(c.url.clone());
                }
                let staged = fresh
                    .into_iter()
                    .map(|c| SegmentStatus::new(c, Duration::from_millis(5), 2.0))
                    .collect();
                tracker.merge(staged);

                let snapshot = tracker.snapshot();
                prop_assert!(snapshot.len() <= capacity);

                let unique: HashSet<_> = snapshot.iter().map(|s| s.url.clone()).collect();
                prop_assert_eq!(unique.len(), snapshot.len());
                prop_assert!(snapshot.iter().all(|s| tracker.is_seen(&s.url)));

                // History is always the tail of everything recorded so far.
                let tail = &recorded[recorded.len() - snapshot.len()..];
                let urls: Vec<String> = snapshot.iter().map(|s| s.url.clone()).collect();
                prop_assert_eq!(urls.as_slice(), tail);
            }
        }
    }
}
