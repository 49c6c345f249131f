//! Gossip profile analysis.
//!
//! A gossip run produces one combined log. Connection records introduce
//! a node and reset its history (a reconnect after a crash starts the
//! node over); event records append a delay and bandwidth observation
//! to the node that logged them. Every record, connection or event,
//! also feeds the run-wide delay and bandwidth series, bucketed per
//! second.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::buckets::{AggregateError, BucketSeries, TimeBuckets};
use crate::parser::{self, ParseError};
use crate::record::{GossipKind, GossipRecord};
use crate::stats::{self, DistributionSummary};

/// What one node did over the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeActivity {
    pub node: String,
    /// Number of events attributed to this node since its last
    /// connection record.
    pub samples: usize,
    pub mean_delay: f64,
    pub total_bandwidth: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delays: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bandwidth: Vec<u64>,
}

/// Full gossip run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipReport {
    pub records: usize,
    pub connections: usize,
    pub events: usize,
    pub overall_delay: DistributionSummary,
    pub delay: BucketSeries,
    pub bandwidth: BucketSeries,
    pub nodes: Vec<NodeActivity>,
}

impl GossipReport {
    /// Drop the per-node sample vectors, keeping headline numbers.
    pub fn clear_details(&mut self) {
        for node in &mut self.nodes {
            node.delays.clear();
            node.bandwidth.clear();
        }
    }
}

/// Analyze a gossip log file.
pub fn analyze(path: &Path) -> Result<GossipReport> {
    info!("Analyzing gossip log: {}", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let reader = BufReader::with_capacity(64 * 1024, file);
    let records = parser::parse_gossip_log(reader)
        .with_context(|| format!("Failed to parse gossip log: {}", path.display()))?;
    analyze_records(&records)
}

struct NodeHistory {
    node: String,
    delays: Vec<f64>,
    bandwidth: Vec<u64>,
}

/// Analyze parsed gossip records. Each record carries the line number
/// of its tag line for error attribution.
pub fn analyze_records(records: &[(usize, GossipRecord)]) -> Result<GossipReport> {
    let mut nodes: Vec<NodeHistory> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut delay_series = TimeBuckets::new();
    let mut bandwidth_series = TimeBuckets::new();
    let mut delays = Vec::with_capacity(records.len());
    let mut connections = 0;
    let mut events = 0;

    for (line, record) in records {
        match record.kind {
            GossipKind::Connection => {
                connections += 1;
                match index.get(&record.node) {
                    Some(&slot) => {
                        // A reconnect starts the node's history over.
                        nodes[slot].delays.clear();
                        nodes[slot].bandwidth.clear();
                    }
                    None => {
                        index.insert(record.node.clone(), nodes.len());
                        nodes.push(NodeHistory {
                            node: record.node.clone(),
                            delays: Vec::new(),
                            bandwidth: Vec::new(),
                        });
                    }
                }
            }
            GossipKind::Event => {
                events += 1;
                let slot = *index.get(&record.node).ok_or_else(|| ParseError::UnknownNode {
                    line: *line,
                    node: record.node.clone(),
                })?;
                nodes[slot].delays.push(record.delay);
                nodes[slot].bandwidth.push(record.bandwidth);
            }
        }
        delay_series.record(record.time, record.delay);
        bandwidth_series.record(record.time, record.bandwidth as f64);
        delays.push(record.delay);
    }

    let delay = delay_series.finalize("gossip delay series")?;
    let bandwidth = bandwidth_series.finalize("gossip bandwidth series")?;
    let overall_delay = DistributionSummary::from_samples(&delays).ok_or_else(|| {
        AggregateError::EmptyDataset {
            context: "gossip delay samples".to_string(),
        }
    })?;

    let nodes: Vec<NodeActivity> = nodes
        .into_iter()
        .map(|history| NodeActivity {
            samples: history.delays.len(),
            mean_delay: stats::mean(&history.delays),
            total_bandwidth: history.bandwidth.iter().sum(),
            node: history.node,
            delays: history.delays,
            bandwidth: history.bandwidth,
        })
        .collect();

    info!(
        "Gossip run: {} records ({} connections, {} events) across {} node(s), {} second(s)",
        records.len(),
        connections,
        events,
        nodes.len(),
        delay.len()
    );

    Ok(GossipReport {
        records: records.len(),
        connections,
        events,
        overall_delay,
        delay,
        bandwidth,
        nodes,
    })
}
