//! # Simlog - Batch analysis for distributed-systems experiment logs
//!
//! This library turns the raw logs left behind by message-passing
//! experiments into propagation and bandwidth reports.
//!
//! ## Overview
//!
//! Three experiment families are supported, each with its own log
//! dialect:
//!
//! - **Gossip mesh**: one combined log of connection and event records,
//!   each followed by a delay line and a bandwidth line
//! - **Reliable multicast**: one directory per run with
//!   `bandwidth<i>.txt` and `log<i>.txt` per node
//! - **Blockchain**: one tagged log (`B`, `T`, `BLK`, `TB`, `CS`
//!   records) covering bandwidth, transaction propagation, block
//!   receipts, block inclusion, and chain splits
//!
//! All pipelines share the same aggregation machinery: per-second time
//! buckets with sum/min/max/median/p90 per bucket, keyed propagation
//! trackers folding repeated observations into per-key rows, and
//! distribution summaries for box-plot style reporting.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `record`: the parsed record model shared by all dialects
//! - `parser`: line-level parsers with positioned errors
//! - `stats`: means, medians, interpolated percentiles
//! - `buckets`: per-second time bucketing
//! - `propagation`: keyed propagation tracking
//! - `chain`: block receipt folding and chain-split bookkeeping
//! - `gossip`, `multicast`, `blockchain`: one pipeline per profile
//! - `cache`: parsed-record cache for large tagged logs
//! - `config`: experiment manifest (named profiles in YAML)
//! - `report`: JSON and text report generation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let report = simlog::gossip::analyze(Path::new("logs/3.txt"))?;
//! println!("median delay: {:.3}s", report.overall_delay.median);
//! println!("total bandwidth: {:.0}", report.bandwidth.total());
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Pipeline entry points return `Result<T, color_eyre::eyre::Error>`;
//! parsing and aggregation failures carry typed errors (`ParseError`,
//! `AggregateError`) with line numbers or series names so a malformed
//! log points at the offending line.

pub mod record;
pub mod parser;

pub mod stats;
pub mod buckets;
pub mod propagation;
pub mod chain;

pub mod gossip;
pub mod multicast;
pub mod blockchain;

pub mod cache;
pub mod config;
pub mod report;
