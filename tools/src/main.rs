//! tx-tracker: headless runner for the transaction tracker.
//!
//! Usage:
//!   tx-tracker --tx <txid> [--config data/tracker_config.json] [--json]
//!   tx-tracker --graph <txid>
//!   tx-tracker --wallet <address> [--after <unix-ts>]
//!
//! Overrides: --retries N --delay-ms N --contamination F --seed N

use anyhow::{bail, Result};
use std::env;
use std::path::Path;
use txtrack_core::{config::TrackerConfig, error::TrackerError, tracker::{TraceReport, Tracker}};

const DEFAULT_CONFIG: &str = "./data/tracker_config.json";

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config_path = string_arg(&args, "--config").unwrap_or(DEFAULT_CONFIG);
    let json_out = args.iter().any(|a| a == "--json");

    let mut config = if Path::new(config_path).exists() {
        TrackerConfig::load(config_path)?
    } else {
        log::warn!("No config at {config_path}, using built-in defaults");
        TrackerConfig::default()
    };
    config.api.retries = parse_arg(&args, "--retries", config.api.retries);
    config.api.retry_delay_ms = parse_arg(&args, "--delay-ms", config.api.retry_delay_ms);
    config.anomaly.contamination = parse_arg(&args, "--contamination", config.anomaly.contamination);
    config.anomaly.seed = parse_arg(&args, "--seed", config.anomaly.seed);

    let mut tracker = Tracker::build(config)?;

    if let Some(txid) = string_arg(&args, "--graph") {
        match tracker.transaction_graph(txid) {
            Ok(data) => println!("{}", serde_json::to_string(&data)?),
            Err(e) => print_error(e)?,
        }
    } else if let Some(address) = string_arg(&args, "--wallet") {
        let after = string_arg(&args, "--after").and_then(|s| s.parse().ok());
        let data = tracker.wallet_graph(address, after);
        println!("{}", serde_json::to_string(&data)?);
    } else if let Some(txid) = string_arg(&args, "--tx") {
        match tracker.trace(txid) {
            Ok(report) if json_out => println!("{}", serde_json::to_string_pretty(&report)?),
            Ok(report) => print_summary(&report),
            Err(e) => print_error(e)?,
        }
    } else {
        bail!("one of --tx, --graph or --wallet is required");
    }

    Ok(())
}

fn print_error(e: TrackerError) -> Result<()> {
    let message = match e {
        TrackerError::TransactionNotFound { .. } => "Transaction not found".to_string(),
        other => other.to_string(),
    };
    println!("{}", serde_json::to_string(&ErrorBody { error: message })?);
    std::process::exit(1);
}

fn print_summary(report: &TraceReport) {
    let first_seen = report
        .transfers
        .iter()
        .filter_map(|t| t.timestamp())
        .min()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "n/a".into());

    println!("=== TRACE SUMMARY ===");
    println!("  report_id:      {}", report.report_id);
    println!("  txid:           {}", report.txid);
    println!("  tx time:        {first_seen}");
    println!("  transfers:      {}", report.transfers.len());
    println!("  wallets:        {}", report.graph.nodes.len());
    println!("  edges:          {}", report.graph.links.len());
    println!("  clusters:       {}", report.cluster_count);
    println!("  largest:        {} wallets", report.largest_cluster.len());

    println!();
    println!("=== END RECEIVERS ===");
    if report.end_receivers.is_empty() {
        println!("  (none)");
    }
    for wallet in &report.end_receivers {
        println!("  {wallet}");
    }

    println!();
    println!("=== BLACKLIST CANDIDATES ===");
    if report.blacklist.is_empty() {
        println!("  (none)");
    }
    for candidate in &report.blacklist {
        println!("  {} (seen {}x)", candidate.address, candidate.occurrences);
    }

    println!();
    println!("=== ANOMALOUS TRANSFERS ===");
    if report.anomalies.is_empty() {
        println!("  (none)");
    }
    for flagged in &report.anomalies {
        let r = &flagged.record;
        println!("  {} -> {} | {:.8} BTC", r.from_wallet, r.to_wallet, r.amount);
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
