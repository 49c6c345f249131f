//! Batch analysis CLI for distributed-systems experiment logs.
//!
//! Analyzes gossip mesh, reliable multicast, and blockchain runs from
//! their log files and writes JSON and text reports.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};

use simlog::config::{self, ExperimentManifest, Profile};
use simlog::report::{self, RunMetadata, RunReport};
use simlog::{blockchain, gossip, multicast};

#[derive(Parser)]
#[command(name = "simlog")]
#[command(about = "Batch analysis for distributed-systems experiment logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to an experiment manifest (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for reports
    #[arg(short, long, default_value = "analysis_output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a gossip mesh log
    Gossip {
        /// Path to the combined log file
        #[arg(conflicts_with = "profile")]
        input: Option<PathBuf>,

        /// Named profile from the manifest
        #[arg(short, long)]
        profile: Option<String>,

        /// Keep per-node sample vectors in the JSON report
        #[arg(long)]
        detailed: bool,
    },

    /// Analyze a multicast run directory
    Multicast {
        /// Run directory holding bandwidth<i>.txt / log<i>.txt pairs
        #[arg(conflicts_with = "profile")]
        dir: Option<PathBuf>,

        /// Named profile from the manifest
        #[arg(short, long)]
        profile: Option<String>,

        /// Expected node count (otherwise discovered from the directory)
        #[arg(short, long)]
        nodes: Option<usize>,

        /// Keep raw spread samples in the JSON report
        #[arg(long)]
        detailed: bool,
    },

    /// Analyze a blockchain log
    Blockchain {
        /// Path to the tagged log file
        #[arg(conflicts_with = "profile")]
        input: Option<PathBuf>,

        /// Named profile from the manifest
        #[arg(short, long)]
        profile: Option<String>,

        /// Reuse and maintain the parsed-record cache next to the log
        #[arg(long)]
        cache: bool,

        /// Keep per-transaction and per-block rows in the JSON report
        #[arg(long)]
        detailed: bool,
    },

    /// Scan a tagged log and print record counts without analyzing
    Scan {
        /// Path to the tagged log file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    // Set thread pool size
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    // Create output directory
    fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory: {}", cli.output.display()))?;

    match cli.command {
        Commands::Gossip {
            ref input,
            ref profile,
            detailed,
        } => {
            let input = resolve_gossip(&cli, input.clone(), profile.as_deref())?;
            let mut gossip_report = gossip::analyze(&input)?;
            if !detailed {
                gossip_report.clear_details();
            }

            let report = RunReport {
                metadata: RunMetadata::new(Profile::Gossip, &input, gossip_report.records),
                gossip: Some(gossip_report),
                multicast: None,
                blockchain: None,
            };

            report::generate_json_report(&report, &cli.output.join("gossip_report.json"))?;
            report::generate_text_report(&report, &cli.output.join("gossip_report.txt"))?;
            report::print_summary(&report);
        }
        Commands::Multicast {
            ref dir,
            ref profile,
            nodes,
            detailed,
        } => {
            let (dir, expected) = resolve_multicast(&cli, dir.clone(), profile.as_deref(), nodes)?;
            let mut multicast_report = multicast::analyze(&dir, expected)?;
            if !detailed {
                multicast_report.clear_details();
            }

            let report = RunReport {
                metadata: RunMetadata::new(Profile::Multicast, &dir, multicast_report.records),
                gossip: None,
                multicast: Some(multicast_report),
                blockchain: None,
            };

            report::generate_json_report(&report, &cli.output.join("multicast_report.json"))?;
            report::generate_text_report(&report, &cli.output.join("multicast_report.txt"))?;
            report::print_summary(&report);
        }
        Commands::Blockchain {
            ref input,
            ref profile,
            cache,
            detailed,
        } => {
            let input = resolve_blockchain(&cli, input.clone(), profile.as_deref())?;
            let mut blockchain_report = blockchain::analyze(&input, cache)?;
            if !detailed {
                blockchain_report.clear_details();
            }

            let report = RunReport {
                metadata: RunMetadata::new(Profile::Blockchain, &input, blockchain_report.records),
                gossip: None,
                multicast: None,
                blockchain: Some(blockchain_report),
            };

            report::generate_json_report(&report, &cli.output.join("blockchain_report.json"))?;
            report::generate_text_report(&report, &cli.output.join("blockchain_report.txt"))?;
            report::print_summary(&report);
        }
        Commands::Scan { ref input } => {
            let scan = blockchain::load_records(input, false)?;
            let tally = blockchain::tally(&scan.records);

            println!("\n=== TAGGED LOG SCAN ===\n");
            println!("Input: {}", input.display());
            println!("Records: {}", scan.records.len());
            println!("  B (bandwidth):    {}", tally.bandwidth);
            println!("  T (transaction):  {}", tally.transactions);
            println!("  BLK (block):      {}", tally.block_receipts);
            println!("  TB (inclusion):   {}", tally.tx_inclusions);
            println!("  CS (chain split): {}", tally.chain_splits);
            println!("Skipped lines: {}", scan.skipped);
            println!();
        }
    }

    Ok(())
}

fn load_cli_manifest(cli: &Cli) -> Result<ExperimentManifest> {
    let path = cli
        .config
        .as_deref()
        .ok_or_else(|| eyre!("--profile requires --config pointing at an experiment manifest"))?;
    config::load_manifest(path)
}

fn resolve_gossip(cli: &Cli, input: Option<PathBuf>, profile: Option<&str>) -> Result<PathBuf> {
    match (input, profile) {
        (Some(path), _) => Ok(path),
        (None, Some(name)) => {
            let manifest = load_cli_manifest(cli)?;
            let profile = manifest
                .gossip_profile(name)
                .ok_or_else(|| eyre!("No gossip profile named '{}' in manifest", name))?;
            Ok(profile.input.clone())
        }
        (None, None) => Err(eyre!("Provide a log path or --profile <name>")),
    }
}

fn resolve_blockchain(cli: &Cli, input: Option<PathBuf>, profile: Option<&str>) -> Result<PathBuf> {
    match (input, profile) {
        (Some(path), _) => Ok(path),
        (None, Some(name)) => {
            let manifest = load_cli_manifest(cli)?;
            let profile = manifest
                .blockchain_profile(name)
                .ok_or_else(|| eyre!("No blockchain profile named '{}' in manifest", name))?;
            Ok(profile.input.clone())
        }
        (None, None) => Err(eyre!("Provide a log path or --profile <name>")),
    }
}

fn resolve_multicast(
    cli: &Cli,
    dir: Option<PathBuf>,
    profile: Option<&str>,
    nodes: Option<usize>,
) -> Result<(PathBuf, Option<usize>)> {
    match (dir, profile) {
        (Some(path), _) => Ok((path, nodes)),
        (None, Some(name)) => {
            let manifest = load_cli_manifest(cli)?;
            let profile = manifest
                .multicast_profile(name)
                .ok_or_else(|| eyre!("No multicast profile named '{}' in manifest", name))?;
            // An explicit --nodes wins over the manifest's count.
            Ok((profile.dir.clone(), nodes.or(profile.nodes)))
        }
        (None, None) => Err(eyre!("Provide a run directory or --profile <name>")),
    }
}
