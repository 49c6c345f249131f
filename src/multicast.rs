//! Multicast profile analysis.
//!
//! A multicast run leaves one directory with two files per node,
//! numbered from 1: `bandwidth<i>.txt` (time/length pairs) and
//! `log<i>.txt` (delivery records). Bandwidth is aggregated per node
//! into per-second sums, each series starting at the node's own first
//! sample and zero-padded to the longest series so the curves can be
//! plotted against a shared axis. Delivery records from every node
//! merge into one table keyed by message, producing the spread between
//! the first send and the last relayed delivery of each message.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use color_eyre::eyre::{eyre, Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::buckets::TimeBuckets;
use crate::parser;
use crate::record::DeliveryRecord;
use crate::stats::DistributionSummary;

static BANDWIDTH_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bandwidth(\d+)\.txt$").expect("Invalid bandwidth file regex"));
static LOG_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^log(\d+)\.txt$").expect("Invalid log file regex"));

/// Per-second bandwidth sums for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBandwidth {
    /// 1-based node number, matching the file names.
    pub node: usize,
    pub per_second: Vec<f64>,
}

/// Full multicast run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastReport {
    /// Total parsed records across all nodes, bandwidth samples and
    /// delivery lines together.
    pub records: usize,
    pub nodes: usize,
    /// Length every per-second series is padded to.
    pub seconds: usize,
    pub node_bandwidth: Vec<NodeBandwidth>,
    /// Messages with both a send and at least one relayed delivery.
    pub delivered_messages: usize,
    /// Messages missing one side of the pair, typically cut off by a
    /// node failure.
    pub incomplete_messages: usize,
    /// Spread distribution; `None` when no message completed.
    pub spread: Option<DistributionSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spreads: Vec<f64>,
}

impl MulticastReport {
    /// Drop the raw spread samples, keeping the distribution summary.
    pub fn clear_details(&mut self) {
        self.spreads.clear();
    }
}

/// Count the node file pairs in a run directory. Numbering must be
/// contiguous from 1 and every node needs both files.
pub fn discover_node_files(dir: &Path) -> Result<usize> {
    let mut bandwidth = HashSet::new();
    let mut logs = HashSet::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read run directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read run directory: {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = BANDWIDTH_FILE.captures(name) {
            if let Ok(index) = caps[1].parse::<usize>() {
                bandwidth.insert(index);
            }
        } else if let Some(caps) = LOG_FILE.captures(name) {
            if let Ok(index) = caps[1].parse::<usize>() {
                logs.insert(index);
            }
        }
    }

    if bandwidth.is_empty() && logs.is_empty() {
        return Err(eyre!(
            "No bandwidth<i>.txt / log<i>.txt files found in {}",
            dir.display()
        ));
    }
    let count = bandwidth.len().max(logs.len());
    for index in 1..=count {
        if !bandwidth.contains(&index) {
            return Err(eyre!("Missing bandwidth{}.txt in {}", index, dir.display()));
        }
        if !logs.contains(&index) {
            return Err(eyre!("Missing log{}.txt in {}", index, dir.display()));
        }
    }
    Ok(count)
}

struct NodeData {
    records: usize,
    per_second: Vec<f64>,
    deliveries: Vec<DeliveryRecord>,
}

fn load_node(dir: &Path, index: usize) -> Result<NodeData> {
    let bandwidth_path = dir.join(format!("bandwidth{}.txt", index));
    let file = File::open(&bandwidth_path)
        .with_context(|| format!("Failed to open log file: {}", bandwidth_path.display()))?;
    let samples = parser::parse_bandwidth_log(BufReader::with_capacity(64 * 1024, file))
        .with_context(|| format!("Failed to parse bandwidth log: {}", bandwidth_path.display()))?;
    let mut series = TimeBuckets::new();
    for sample in &samples {
        series.record(sample.time, sample.length);
    }
    let per_second = series
        .finalize(&format!("bandwidth for node {}", index))?
        .sums();

    let log_path = dir.join(format!("log{}.txt", index));
    let file = File::open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
    let deliveries = parser::parse_delivery_log(BufReader::with_capacity(64 * 1024, file))
        .with_context(|| format!("Failed to parse delivery log: {}", log_path.display()))?;

    Ok(NodeData {
        records: samples.len() + deliveries.len(),
        per_second,
        deliveries,
    })
}

/// Analyze a multicast run directory. `expected_nodes` pins the node
/// count; when `None` the count is discovered from the directory.
pub fn analyze(dir: &Path, expected_nodes: Option<usize>) -> Result<MulticastReport> {
    info!("Analyzing multicast run directory: {}", dir.display());
    let count = discover_node_files(dir)?;
    if let Some(expected) = expected_nodes {
        if count != expected {
            return Err(eyre!(
                "Expected {} node(s) in {} but found {}",
                expected,
                dir.display(),
                count
            ));
        }
    }

    let node_data: Vec<NodeData> = (1..=count)
        .into_par_iter()
        .map(|index| load_node(dir, index))
        .collect::<Result<Vec<_>>>()?;
    let records: usize = node_data.iter().map(|d| d.records).sum();

    // Pad every per-second series to the longest one.
    let seconds = node_data
        .iter()
        .map(|d| d.per_second.len())
        .max()
        .unwrap_or(0);
    let node_bandwidth: Vec<NodeBandwidth> = node_data
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let mut per_second = data.per_second.clone();
            per_second.resize(seconds, 0.0);
            NodeBandwidth {
                node: i + 1,
                per_second,
            }
        })
        .collect();

    // Merge every node's deliveries into one table: per message, the
    // latest send time and the latest relayed delivery time, seeded at
    // -1 so a missing side stays recognizable.
    let mut timestamps: HashMap<String, (f64, f64)> = HashMap::new();
    for record in node_data.iter().flat_map(|d| &d.deliveries) {
        let slot = timestamps.entry(record.key.clone()).or_insert((-1.0, -1.0));
        let cell = if record.first { &mut slot.0 } else { &mut slot.1 };
        if record.time > *cell {
            *cell = record.time;
        }
    }

    let mut messages: Vec<(&String, &(f64, f64))> = timestamps.iter().collect();
    messages.sort_by(|a, b| a.0.cmp(b.0));
    let spreads: Vec<f64> = messages
        .iter()
        .filter(|(_, (first, last))| *first >= 0.0 && *last >= 0.0)
        .map(|(_, (first, last))| last - first)
        .collect();
    let delivered_messages = spreads.len();
    let incomplete_messages = timestamps.len() - delivered_messages;
    if incomplete_messages > 0 {
        warn!(
            "{} message(s) missing a send or delivery record",
            incomplete_messages
        );
    }
    let spread = DistributionSummary::from_samples(&spreads);

    info!(
        "Multicast run: {} node(s), {} second(s), {} delivered message(s)",
        count, seconds, delivered_messages
    );

    Ok(MulticastReport {
        records,
        nodes: count,
        seconds,
        node_bandwidth,
        delivered_messages,
        incomplete_messages,
        spread,
        spreads,
    })
}
