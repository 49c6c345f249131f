//! Block receipt and chain-split bookkeeping for the blockchain profile.
//!
//! Block receipts fold per hash into (first seen, last seen, count);
//! the spread between first and last receipt is the block's propagation
//! delay. Unlike transactions, blocks carry no creation timestamp, so
//! the fold keeps a running min and max and stays correct when receipts
//! arrive out of time order.
//!
//! Split reports are keyed by timestamp: a node that re-reports a split
//! at a timestamp already on file is giving a corrected length for the
//! same fork event, so the later report replaces the earlier one in
//! place instead of adding a second row.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::record::SimTime;

/// Propagation of one block across the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPropagation {
    pub hash: String,
    /// Earliest receipt time seen for this hash.
    pub first_seen: SimTime,
    /// Last receipt minus first receipt.
    pub propagation_delay: f64,
    pub receipts: u64,
}

/// Accumulator for `BLK` receipts, keyed by block hash.
#[derive(Debug, Clone, Default)]
pub struct BlockTracker {
    blocks: HashMap<String, (SimTime, SimTime, u64)>,
    receipts: u64,
}

impl BlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, hash: &str, time: SimTime) {
        self.receipts += 1;
        let entry = self.blocks.entry(hash.to_string()).or_insert((time, time, 0));
        if time < entry.0 {
            entry.0 = time;
        }
        if time > entry.1 {
            entry.1 = time;
        }
        entry.2 += 1;
    }

    pub fn unique_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Every receipt counts, including repeats of the same hash.
    pub fn total_receipts(&self) -> u64 {
        self.receipts
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Drain into rows ordered by (first_seen, hash).
    pub fn into_summaries(self) -> Vec<BlockPropagation> {
        let mut summaries: Vec<BlockPropagation> = self
            .blocks
            .into_iter()
            .map(|(hash, (first, last, receipts))| BlockPropagation {
                hash,
                first_seen: first,
                propagation_delay: last - first,
                receipts,
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.first_seen
                .partial_cmp(&b.first_seen)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        summaries
    }
}

/// One observed fork: the chain briefly had `length` competing blocks
/// at `time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSplit {
    pub time: SimTime,
    pub length: u64,
}

/// Ordered log of split events, deduplicated by exact timestamp.
#[derive(Debug, Clone, Default)]
pub struct ChainSplitLog {
    splits: Vec<ChainSplit>,
}

impl ChainSplitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a split. A timestamp match (exact, as parsed) updates the
    /// existing entry's length and keeps its position; anything else
    /// appends.
    pub fn record(&mut self, time: SimTime, length: u64) {
        for split in &mut self.splits {
            if split.time == time {
                split.length = length;
                return;
            }
        }
        self.splits.push(ChainSplit { time, length });
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn max_length(&self) -> u64 {
        self.splits.iter().map(|s| s.length).max().unwrap_or(0)
    }

    pub fn into_splits(self) -> Vec<ChainSplit> {
        self.splits
    }
}

/// Headline numbers for the chain health section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub unique_blocks: usize,
    pub block_receipts: u64,
    pub chain_splits: usize,
    pub max_split_length: u64,
    /// Splits per block receipt; zero when no receipts were logged.
    pub split_ratio: f64,
}

impl ChainSummary {
    pub fn new(unique_blocks: usize, block_receipts: u64, splits: &[ChainSplit]) -> Self {
        let split_ratio = if block_receipts == 0 {
            0.0
        } else {
            splits.len() as f64 / block_receipts as f64
        };
        Self {
            unique_blocks,
            block_receipts,
            chain_splits: splits.len(),
            max_split_length: splits.iter().map(|s| s.length).max().unwrap_or(0),
            split_ratio,
        }
    }
}
