//! Blockchain profile analysis.
//!
//! One tagged log carries the whole run. Each record kind feeds its own
//! accumulator: `B` records the per-second bandwidth series, `T` and
//! `TB` the keyed propagation trackers (network propagation and block
//! inclusion), `BLK` the per-hash block fold, `CS` the chain-split log.
//! Transaction and inclusion rows are reported with create times
//! rebased to the earliest one; block first-seen times stay absolute,
//! as `BLK` records carry no creation timestamp of their own.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::buckets::{AggregateError, BucketSeries, TimeBuckets};
use crate::cache;
use crate::chain::{BlockPropagation, BlockTracker, ChainSplit, ChainSplitLog, ChainSummary};
use crate::parser::{self, TaggedScan};
use crate::propagation::{self, PropagationStats, PropagationTracker};
use crate::record::TaggedRecord;
use crate::stats::DistributionSummary;

/// Record counts per tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TagTally {
    pub bandwidth: usize,
    pub transactions: usize,
    pub block_receipts: usize,
    pub tx_inclusions: usize,
    pub chain_splits: usize,
}

pub fn tally(records: &[TaggedRecord]) -> TagTally {
    let mut tally = TagTally::default();
    for record in records {
        match record {
            TaggedRecord::Bandwidth { .. } => tally.bandwidth += 1,
            TaggedRecord::Transaction { .. } => tally.transactions += 1,
            TaggedRecord::BlockReceipt { .. } => tally.block_receipts += 1,
            TaggedRecord::TxInclusion { .. } => tally.tx_inclusions += 1,
            TaggedRecord::ChainSplit { .. } => tally.chain_splits += 1,
        }
    }
    tally
}

/// Full blockchain run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainReport {
    pub records: usize,
    /// Lines skipped by the parser for carrying an unrecognized tag.
    pub skipped_lines: usize,
    pub tally: TagTally,
    /// Per-second bandwidth; `None` when the log had no `B` records.
    pub bandwidth: Option<BucketSeries>,
    /// Distribution of per-transaction max propagation delays.
    pub transaction_delay: Option<DistributionSummary>,
    /// Distribution of per-transaction max inclusion delays.
    pub inclusion_delay: Option<DistributionSummary>,
    /// Distribution of per-block propagation delays.
    pub block_delay: Option<DistributionSummary>,
    /// Distinct transaction receive counts, ascending. A fully healthy
    /// run shows a single value: the node count.
    pub distinct_receive_counts: Vec<u64>,
    pub chain: ChainSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<PropagationStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transaction_inclusions: Vec<PropagationStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<BlockPropagation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain_splits: Vec<ChainSplit>,
}

impl BlockchainReport {
    /// Drop the per-key rows, keeping counts and distributions.
    pub fn clear_details(&mut self) {
        self.transactions.clear();
        self.transaction_inclusions.clear();
        self.blocks.clear();
        self.chain_splits.clear();
    }
}

/// Load the tagged records for a log, going through the parsed-record
/// cache when `use_cache` is set.
pub fn load_records(path: &Path, use_cache: bool) -> Result<TaggedScan> {
    if use_cache {
        if let Some(scan) = cache::load(path) {
            return Ok(scan);
        }
    }
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let scan = parser::parse_tagged_log(BufReader::with_capacity(64 * 1024, file))
        .with_context(|| format!("Failed to parse blockchain log: {}", path.display()))?;
    if use_cache {
        if let Err(err) = cache::store(path, &scan) {
            warn!("Failed to write record cache for {}: {:#}", path.display(), err);
        }
    }
    Ok(scan)
}

/// Analyze a blockchain log file.
pub fn analyze(path: &Path, use_cache: bool) -> Result<BlockchainReport> {
    info!("Analyzing blockchain log: {}", path.display());
    let scan = load_records(path, use_cache)?;
    analyze_scan(&scan)
}

/// Analyze an already parsed scan.
pub fn analyze_scan(scan: &TaggedScan) -> Result<BlockchainReport> {
    if scan.records.is_empty() {
        return Err(AggregateError::EmptyDataset {
            context: "blockchain log".to_string(),
        }
        .into());
    }

    let mut bandwidth = TimeBuckets::new();
    let mut transactions = PropagationTracker::new();
    let mut inclusions = PropagationTracker::new();
    let mut blocks = BlockTracker::new();
    let mut splits = ChainSplitLog::new();

    for record in &scan.records {
        match record {
            TaggedRecord::Bandwidth { time, length } => {
                bandwidth.record(*time, *length as f64);
            }
            TaggedRecord::Transaction {
                observed,
                id,
                create_time,
            } => {
                transactions.observe(id, *observed, *create_time);
            }
            TaggedRecord::BlockReceipt { time, hash } => {
                blocks.observe(hash, *time);
            }
            TaggedRecord::TxInclusion {
                observed,
                id,
                create_time,
            } => {
                inclusions.observe(id, *observed, *create_time);
            }
            TaggedRecord::ChainSplit { time, length } => {
                splits.record(*time, *length);
            }
        }
    }

    let tally = tally(&scan.records);
    let bandwidth = if bandwidth.is_empty() {
        None
    } else {
        Some(bandwidth.finalize("blockchain bandwidth series")?)
    };

    let mut transactions = transactions.into_summaries();
    let distinct_receive_counts = propagation::distinct_receive_counts(&transactions);
    normalize_create_times(&mut transactions);
    let mut transaction_inclusions = inclusions.into_summaries();
    normalize_create_times(&mut transaction_inclusions);

    let unique_blocks = blocks.unique_blocks();
    let block_receipts = blocks.total_receipts();
    let blocks = blocks.into_summaries();
    let chain_splits = splits.into_splits();
    let chain = ChainSummary::new(unique_blocks, block_receipts, &chain_splits);

    let transaction_delay = summarize_delays(transactions.iter().map(|s| s.max_delay));
    let inclusion_delay = summarize_delays(transaction_inclusions.iter().map(|s| s.max_delay));
    let block_delay = summarize_delays(blocks.iter().map(|b| b.propagation_delay));

    info!(
        "Blockchain run: {} record(s), {} transaction(s), {} unique block(s), {} chain split(s)",
        scan.records.len(),
        transactions.len(),
        unique_blocks,
        chain.chain_splits
    );

    Ok(BlockchainReport {
        records: scan.records.len(),
        skipped_lines: scan.skipped,
        tally,
        bandwidth,
        transaction_delay,
        inclusion_delay,
        block_delay,
        distinct_receive_counts,
        chain,
        transactions,
        transaction_inclusions,
        blocks,
        chain_splits,
    })
}

/// Rebase create times so the earliest becomes zero. Summaries arrive
/// sorted by create time, so the first row holds the minimum.
fn normalize_create_times(summaries: &mut [PropagationStats]) {
    let Some(origin) = summaries.first().map(|s| s.create_time) else {
        return;
    };
    for summary in summaries.iter_mut() {
        summary.create_time -= origin;
    }
}

fn summarize_delays(delays: impl Iterator<Item = f64>) -> Option<DistributionSummary> {
    let delays: Vec<f64> = delays.collect();
    DistributionSummary::from_samples(&delays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(log: &str) -> TaggedScan {
        parser::parse_tagged_log(Cursor::new(log)).unwrap()
    }

    #[test]
    fn test_full_pipeline() {
        let log = concat!(
            "B 0.5 300\n",
            "B 1.5 100\n",
            "T node1 5.0 TRANSACTION 2.0\n",
            "T node2 6.0 TRANSACTION 2.0\n",
            "T node1 9.0 TRANSACTION 8.0\n",
            "BLK node1 6.0 abc\n",
            "BLK node2 7.5 abc\n",
            "BLK node1 9.0 def\n",
            "TB node1 12.0 2.0\n",
            "CS node1 3.0 2 h1 h2\n",
            "CS node2 3.0 4 h1 h3\n",
        );
        let report = analyze_scan(&scan(log)).unwrap();

        assert_eq!(report.records, 11);
        assert_eq!(report.tally.bandwidth, 2);
        assert_eq!(report.tally.transactions, 3);
        assert_eq!(report.tally.block_receipts, 3);

        let bandwidth = report.bandwidth.as_ref().unwrap();
        assert_eq!(bandwidth.len(), 2);
        assert_eq!(bandwidth.buckets[0].sum, 300.0);
        assert_eq!(bandwidth.buckets[1].sum, 100.0);

        // Two transactions; create times rebased onto the earliest.
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].key, "2.0");
        assert_eq!(report.transactions[0].create_time, 0.0);
        assert_eq!(report.transactions[0].max_delay, 4.0);
        assert_eq!(report.transactions[0].receive_count, 2);
        assert_eq!(report.transactions[1].create_time, 6.0);
        assert_eq!(report.distinct_receive_counts, vec![1, 2]);

        // Blocks keep absolute first-seen times.
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[0].hash, "abc");
        assert_eq!(report.blocks[0].first_seen, 6.0);
        assert_eq!(report.blocks[0].propagation_delay, 1.5);

        assert_eq!(report.chain.unique_blocks, 2);
        assert_eq!(report.chain.block_receipts, 3);
        // The duplicate timestamp collapsed into one split, length 4.
        assert_eq!(report.chain.chain_splits, 1);
        assert_eq!(report.chain.max_split_length, 4);
        assert_eq!(report.chain_splits, vec![ChainSplit { time: 3.0, length: 4 }]);
        assert!((report.chain.split_ratio - 1.0 / 3.0).abs() < 1e-12);

        assert_eq!(report.transaction_delay.as_ref().unwrap().count, 2);
        assert_eq!(report.inclusion_delay.as_ref().unwrap().count, 1);
        assert_eq!(report.block_delay.as_ref().unwrap().max, 1.5);
    }

    #[test]
    fn test_empty_log_is_an_error() {
        let err = analyze_scan(&TaggedScan::default()).unwrap_err();
        assert!(err.to_string().contains("blockchain log"));
    }

    #[test]
    fn test_missing_sections_stay_absent() {
        let report = analyze_scan(&scan("CS node1 3.0 2 h1 h2\n")).unwrap();
        assert!(report.bandwidth.is_none());
        assert!(report.transaction_delay.is_none());
        assert!(report.block_delay.is_none());
        assert!(report.transactions.is_empty());
        assert_eq!(report.chain.chain_splits, 1);
        assert_eq!(report.chain.split_ratio, 0.0);
    }

    #[test]
    fn test_skipped_lines_are_reported() {
        let report = analyze_scan(&scan("B 1.0 10\nNOISE x y z\n")).unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_clear_details() {
        let log = "T node1 5.0 TRANSACTION 2.0\nBLK node1 6.0 abc\nCS node1 3.0 2 h1 h2\n";
        let mut report = analyze_scan(&scan(log)).unwrap();
        report.clear_details();
        assert!(report.transactions.is_empty());
        assert!(report.blocks.is_empty());
        assert!(report.chain_splits.is_empty());
        assert_eq!(report.chain.chain_splits, 1);
        assert!(report.transaction_delay.is_some());
    }
}
