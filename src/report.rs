//! Report generation for experiment analysis.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::blockchain::BlockchainReport;
use crate::buckets::{BucketSeries, BucketStats};
use crate::config::Profile;
use crate::gossip::GossipReport;
use crate::multicast::MulticastReport;
use crate::stats::DistributionSummary;

/// Provenance block included in every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: String,
    pub profile: Profile,
    pub input: String,
    pub records: usize,
}

impl RunMetadata {
    pub fn new(profile: Profile, input: &Path, records: usize) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            profile,
            input: input.display().to_string(),
            records,
        }
    }
}

/// Top-level report: metadata plus exactly one profile section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gossip: Option<GossipReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multicast: Option<MulticastReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain: Option<BlockchainReport>,
}

/// Generate JSON report
pub fn generate_json_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

fn distribution_lines(label: &str, d: &DistributionSummary) -> Vec<String> {
    vec![
        format!("{} ({} sample(s)):", label, d.count),
        format!(
            "  Min: {:.3}  Median: {:.3}  P90: {:.3}  Max: {:.3}  Mean: {:.3}",
            d.min, d.median, d.p90, d.max, d.mean
        ),
    ]
}

fn busiest(series: &BucketSeries) -> Option<&BucketStats> {
    series
        .buckets
        .iter()
        .max_by(|a, b| a.sum.partial_cmp(&b.sum).unwrap_or(std::cmp::Ordering::Equal))
}

fn section_header(title: &str) -> Vec<String> {
    let padding = 80usize.saturating_sub(title.len()) / 2;
    vec![
        "=".repeat(80),
        format!("{}{}", " ".repeat(padding), title),
        "=".repeat(80),
        String::new(),
    ]
}

/// Generate human-readable text report
pub fn generate_text_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    lines.extend(section_header("EXPERIMENT LOG ANALYSIS"));
    lines.push(format!("Analysis Date: {}", report.metadata.generated_at));
    lines.push(format!("Profile: {}", report.metadata.profile));
    lines.push(format!("Input: {}", report.metadata.input));
    lines.push(format!("Records: {}", report.metadata.records));
    lines.push(String::new());

    if let Some(ref gossip) = report.gossip {
        lines.extend(section_header("GOSSIP MESH ACTIVITY"));
        lines.push(format!(
            "Records: {} ({} connections, {} events)",
            gossip.records, gossip.connections, gossip.events
        ));
        lines.push(format!(
            "Duration: {} second(s) starting at t={}",
            gossip.delay.len(),
            gossip.delay.origin
        ));
        lines.push(String::new());
        lines.extend(distribution_lines("Delay, seconds", &gossip.overall_delay));
        lines.push(String::new());
        lines.push(format!("Total bandwidth: {:.0}", gossip.bandwidth.total()));
        if let Some(peak) = busiest(&gossip.bandwidth) {
            lines.push(format!(
                "Busiest second: {} ({:.0} in {} record(s))",
                peak.second, peak.sum, peak.count
            ));
        }
        lines.push(String::new());
        lines.push("Per-node activity:".to_string());
        for node in &gossip.nodes {
            lines.push(format!(
                "  {}: {} event(s), mean delay {:.3}s, total bandwidth {}",
                node.node, node.samples, node.mean_delay, node.total_bandwidth
            ));
        }
        lines.push(String::new());
    }

    if let Some(ref multicast) = report.multicast {
        lines.extend(section_header("MULTICAST DELIVERY"));
        lines.push(format!("Nodes: {}", multicast.nodes));
        lines.push(format!("Duration: {} second(s)", multicast.seconds));
        lines.push(String::new());
        lines.push("Per-node total bandwidth:".to_string());
        for node in &multicast.node_bandwidth {
            let total: f64 = node.per_second.iter().sum();
            lines.push(format!("  node {}: {:.0}", node.node, total));
        }
        lines.push(String::new());
        lines.push(format!(
            "Messages: {} delivered, {} incomplete",
            multicast.delivered_messages, multicast.incomplete_messages
        ));
        match multicast.spread {
            Some(ref spread) => {
                lines.extend(distribution_lines("Delivery spread, seconds", spread))
            }
            None => lines.push("No message completed a send/delivery pair.".to_string()),
        }
        lines.push(String::new());
    }

    if let Some(ref blockchain) = report.blockchain {
        lines.extend(section_header("BLOCKCHAIN HEALTH"));
        lines.push(format!(
            "Records: {} ({} unrecognized line(s) skipped)",
            blockchain.records, blockchain.skipped_lines
        ));
        let t = &blockchain.tally;
        lines.push(format!(
            "  B: {}  T: {}  BLK: {}  TB: {}  CS: {}",
            t.bandwidth, t.transactions, t.block_receipts, t.tx_inclusions, t.chain_splits
        ));
        lines.push(String::new());
        if let Some(ref bandwidth) = blockchain.bandwidth {
            lines.push(format!(
                "Bandwidth: {:.0} over {} second(s)",
                bandwidth.total(),
                bandwidth.len()
            ));
            lines.push(String::new());
        }
        if let Some(ref delay) = blockchain.transaction_delay {
            lines.extend(distribution_lines("Transaction propagation delay, seconds", delay));
            let counts: Vec<String> = blockchain
                .distinct_receive_counts
                .iter()
                .map(u64::to_string)
                .collect();
            lines.push(format!("  Receive counts seen: {}", counts.join(", ")));
            lines.push(String::new());
        }
        if let Some(ref delay) = blockchain.inclusion_delay {
            lines.extend(distribution_lines("Block inclusion delay, seconds", delay));
            lines.push(String::new());
        }
        lines.push(format!(
            "Blocks: {} unique, {} receipt(s)",
            blockchain.chain.unique_blocks, blockchain.chain.block_receipts
        ));
        if let Some(ref delay) = blockchain.block_delay {
            lines.extend(distribution_lines("Block propagation delay, seconds", delay));
        }
        lines.push(String::new());
        lines.push(format!(
            "Chain splits: {} (max length {}, {:.4} splits per receipt)",
            blockchain.chain.chain_splits,
            blockchain.chain.max_split_length,
            blockchain.chain.split_ratio
        ));
        lines.push(String::new());
    }

    let content = lines.join("\n");
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &RunReport) {
    println!("\n=== {} ANALYSIS SUMMARY ===\n", report.metadata.profile.to_string().to_uppercase());
    println!("Input: {}", report.metadata.input);
    println!("Records: {}", report.metadata.records);

    if let Some(ref gossip) = report.gossip {
        println!("\nGossip:");
        println!("  Nodes: {}", gossip.nodes.len());
        println!("  Median delay: {:.3}s", gossip.overall_delay.median);
        println!("  P90 delay: {:.3}s", gossip.overall_delay.p90);
        println!("  Total bandwidth: {:.0}", gossip.bandwidth.total());
    }

    if let Some(ref multicast) = report.multicast {
        println!("\nMulticast:");
        println!("  Nodes: {}", multicast.nodes);
        println!(
            "  Delivered: {} ({} incomplete)",
            multicast.delivered_messages, multicast.incomplete_messages
        );
        if let Some(ref spread) = multicast.spread {
            println!("  Median spread: {:.3}s", spread.median);
            println!("  Max spread: {:.3}s", spread.max);
        }
    }

    if let Some(ref blockchain) = report.blockchain {
        println!("\nBlockchain:");
        println!(
            "  Blocks: {} unique, {} receipt(s)",
            blockchain.chain.unique_blocks, blockchain.chain.block_receipts
        );
        if let Some(ref delay) = blockchain.transaction_delay {
            println!("  Median tx propagation: {:.3}s", delay.median);
        }
        println!(
            "  Chain splits: {} (ratio {:.4})",
            blockchain.chain.chain_splits, blockchain.chain.split_ratio
        );
    }

    println!();
}
