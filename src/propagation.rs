//! Propagation tracking for keyed records observed at many nodes.
//!
//! Each key (a transaction id, a message id) is observed repeatedly as
//! it spreads through the network. The tracker folds those observations
//! into one row per key: how often it was seen and how late the slowest
//! observation came in relative to the key's creation time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::SimTime;

/// Folded propagation statistics for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationStats {
    pub key: String,
    /// Largest observed delay relative to `create_time`. Seeded at zero,
    /// so an observation that precedes the creation timestamp (clock
    /// skew between nodes) never drives it negative.
    pub max_delay: f64,
    pub receive_count: u64,
    /// Creation time from the first observation of this key. Later
    /// observations may carry a different value; the first one wins.
    pub create_time: SimTime,
}

/// Accumulator keyed by record id.
#[derive(Debug, Clone, Default)]
pub struct PropagationTracker {
    entries: HashMap<String, PropagationStats>,
}

impl PropagationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the tracker.
    pub fn observe(&mut self, key: &str, observed: SimTime, create_time: SimTime) {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| PropagationStats {
                key: key.to_string(),
                max_delay: 0.0,
                receive_count: 0,
                create_time,
            });
        let delay = observed - entry.create_time;
        if delay > entry.max_delay {
            entry.max_delay = delay;
        }
        entry.receive_count += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain the tracker into rows ordered by (create_time, key) so the
    /// same log always produces the same report.
    pub fn into_summaries(self) -> Vec<PropagationStats> {
        let mut summaries: Vec<PropagationStats> = self.entries.into_values().collect();
        summaries.sort_by(|a, b| {
            a.create_time
                .partial_cmp(&b.create_time)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        summaries
    }
}

/// Distinct receive counts across a summary set, ascending.
pub fn distinct_receive_counts(summaries: &[PropagationStats]) -> Vec<u64> {
    let mut counts: Vec<u64> = summaries.iter().map(|s| s.receive_count).collect();
    counts.sort_unstable();
    counts.dedup();
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_fold_into_one_row() {
        let mut tracker = PropagationTracker::new();
        tracker.observe("tx1", 5.0, 2.0);
        tracker.observe("tx1", 6.0, 2.0);
        let summaries = tracker.into_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].key, "tx1");
        assert_eq!(summaries[0].max_delay, 4.0);
        assert_eq!(summaries[0].receive_count, 2);
        assert_eq!(summaries[0].create_time, 2.0);
    }

    #[test]
    fn test_first_create_time_wins() {
        let mut tracker = PropagationTracker::new();
        tracker.observe("tx1", 5.0, 2.0);
        tracker.observe("tx1", 9.0, 7.0);
        let summaries = tracker.into_summaries();
        assert_eq!(summaries[0].create_time, 2.0);
        assert_eq!(summaries[0].max_delay, 7.0);
    }

    #[test]
    fn test_early_observation_clamps_to_zero() {
        let mut tracker = PropagationTracker::new();
        tracker.observe("tx1", 1.0, 3.0);
        let summaries = tracker.into_summaries();
        assert_eq!(summaries[0].max_delay, 0.0);
        assert_eq!(summaries[0].receive_count, 1);
    }

    #[test]
    fn test_summaries_are_ordered() {
        let mut tracker = PropagationTracker::new();
        tracker.observe("b", 4.0, 1.0);
        tracker.observe("a", 4.0, 1.0);
        tracker.observe("c", 2.0, 0.5);
        let summaries = tracker.into_summaries();
        let keys: Vec<&str> = summaries.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_distinct_receive_counts() {
        let mut tracker = PropagationTracker::new();
        tracker.observe("a", 1.0, 0.0);
        tracker.observe("a", 2.0, 0.0);
        tracker.observe("b", 1.0, 0.0);
        tracker.observe("c", 1.0, 0.0);
        tracker.observe("c", 2.0, 0.0);
        let summaries = tracker.into_summaries();
        assert_eq!(distinct_receive_counts(&summaries), vec![1, 2]);
    }
}
