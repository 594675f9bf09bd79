//! ThreatWatch - Main Entry Point
//!
//! Exit codes: 0 = processed (whatever the verdict), 1 = could not attempt
//! processing (malformed trigger, unreadable log, bad configuration).

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

use threatwatch_core::constants::{APP_NAME, APP_VERSION};
use threatwatch_core::logic::aggregator::Aggregator;
use threatwatch_core::logic::config::PipelineConfig;
use threatwatch_core::logic::ingest::{parse_active_response, read_connection_records, LogReader};
use threatwatch_core::logic::pipeline::{detection_input, CycleReport, Pipeline};
use threatwatch_core::logic::response::{DryRunEnforcer, EnforcementPoint, SshEnforcer};
use threatwatch_core::logic::telemetry::{AuditSink, FileAuditSink};

#[derive(Parser)]
#[command(name = "threatwatch", version, about = "Auth/network threat detection and containment")]
struct Cli {
    /// Override AUDIT_LOG_PATH
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate failed logins from an auth log and write the window report
    Analyze {
        #[arg(long)]
        log: PathBuf,
        /// Defaults to REPORT_PATH
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Aggregate, then run a decision cycle for every noisy identity
    Scan {
        #[arg(long)]
        log: PathBuf,
        /// JSON array of connection records
        #[arg(long)]
        flows: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        min_attempts: u64,
        /// Log containment instead of contacting the router
        #[arg(long)]
        dry_run: bool,
    },
    /// Read one active-response alert from stdin and decide on its srcip
    Respond {
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Starting {} v{}", APP_NAME, APP_VERSION);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(path) = cli.audit_log {
        config.audit.log_path = path;
    }

    match cli.command {
        Command::Analyze { log, report } => analyze(&config, log, report),
        Command::Scan {
            log,
            flows,
            min_attempts,
            dry_run,
        } => scan(&config, log, flows, min_attempts, dry_run).await,
        Command::Respond { dry_run } => respond(&config, dry_run).await,
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn analyze(config: &PipelineConfig, log: PathBuf, report: Option<PathBuf>) -> anyhow::Result<()> {
    let aggregator = Aggregator::new();
    for event in LogReader::open(&log)? {
        aggregator.observe(event);
    }

    let window = aggregator.flush_window();
    let path = report.unwrap_or_else(|| config.report_path.clone());
    window.write_to(&path)?;

    println!("Total failed attempts: {}", window.total_failed_attempts);
    for summary in window.ip_summary.values() {
        println!(
            "{:<40} {:>6} attempts  {} users",
            summary.identity,
            summary.attempts,
            summary.distinct_principals()
        );
    }
    Ok(())
}

async fn scan(
    config: &PipelineConfig,
    log: PathBuf,
    flows: Option<PathBuf>,
    min_attempts: u64,
    dry_run: bool,
) -> anyhow::Result<()> {
    let batch = match flows {
        Some(path) => read_connection_records(path)?,
        None => Vec::new(),
    };

    let aggregator = Aggregator::new();
    for event in LogReader::open(&log)? {
        aggregator.observe(event);
    }
    let window = aggregator.flush_window();

    let mut identities: BTreeSet<String> = window
        .identities_over(min_attempts)
        .into_iter()
        .map(|s| s.identity.clone())
        .collect();
    identities.extend(batch.iter().map(|r| r.src_ip.clone()).filter(|ip| !ip.is_empty()));

    let pipeline = build_pipeline(config, dry_run)?;
    log::info!("Scanning {} identities from {}", identities.len(), log.display());

    for identity in identities {
        let summary = window.ip_summary.get(&identity).cloned();
        let input = detection_input(&identity, summary, &batch);
        let report = pipeline.run_cycle(input, window.window_id).await;
        print_report(&report);
    }
    Ok(())
}

async fn respond(config: &PipelineConfig, dry_run: bool) -> anyhow::Result<()> {
    let audit = open_audit(config)?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read trigger from stdin")?;

    let trigger = match parse_active_response(&line) {
        Ok(trigger) => trigger,
        Err(e) => {
            let _ = audit.record(&format!("check failed, please investigate: {}", e));
            return Err(e.into());
        }
    };

    let pipeline = build_pipeline_with(config, dry_run, audit)?;
    let window_secs = config.audit.window.as_secs().max(1);
    let window = Utc::now().timestamp().max(0) as u64 / window_secs;

    let input = detection_input(&trigger.srcip, None, &[]);
    let report = pipeline.run_cycle(input, window).await;
    print_report(&report);
    Ok(())
}

// ============================================================================
// WIRING
// ============================================================================

fn open_audit(config: &PipelineConfig) -> anyhow::Result<Arc<dyn AuditSink>> {
    let sink = FileAuditSink::open(&config.audit.log_path)?;
    Ok(Arc::new(sink))
}

fn build_pipeline(config: &PipelineConfig, dry_run: bool) -> anyhow::Result<Pipeline> {
    let audit = open_audit(config)?;
    build_pipeline_with(config, dry_run, audit)
}

fn build_pipeline_with(
    config: &PipelineConfig,
    dry_run: bool,
    audit: Arc<dyn AuditSink>,
) -> anyhow::Result<Pipeline> {
    let enforcer: Arc<dyn EnforcementPoint> = if dry_run {
        Arc::new(DryRunEnforcer::new())
    } else {
        Arc::new(SshEnforcer::new(&config.enforcement))
    };
    Ok(Pipeline::from_config(config, enforcer, audit)?)
}

fn print_report(report: &CycleReport) {
    let output = serde_json::json!({
        "cycle_id": report.cycle_id,
        "verdict": report.verdict,
        "response": report.response,
    });
    match serde_json::to_string(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => log::warn!("Could not render cycle report: {}", e),
    }
}
