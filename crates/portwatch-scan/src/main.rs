//! CLI entry point for the portwatch exposure monitor.
//!
//! Logs go to stderr; stdout carries one JSON change event per line.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use portwatch_core::{ChangeEvent, HostAddress};
use portwatch_scan::config::{load_watch_config, WatchConfig};
use portwatch_scan::scanner::{NmapExecutor, ProbeMode};
use portwatch_scan::session::ScanSession;
use portwatch_scan::store::FileArtifactStore;

#[derive(Parser)]
#[command(name = "portwatch")]
#[command(about = "Detect newly exposed and newly closed ports across a fleet")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Host to scan; repeat for several. Overrides configured targets.
    #[arg(short, long = "target", global = true)]
    targets: Vec<String>,

    /// File with one host per line (`#` starts a comment).
    #[arg(long, global = true)]
    targets_file: Option<String>,

    /// Bind probes to this network interface.
    #[arg(short, long, global = true)]
    interface: Option<String>,

    /// Scan budget in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Where the previous scan artifact is kept.
    #[arg(long, global = true)]
    artifact_path: Option<String>,

    /// Config file prefix (default: portwatch).
    #[arg(short, long, default_value = "portwatch", global = true)]
    config: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Command {
    /// Scan, diff against the stored scan, store the new scan, print changes.
    Diff,
    /// Scan and store the result as the baseline for the next diff.
    Seed,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = apply_overrides(load_watch_config(&cli.config)?, &cli);
    let targets = resolve_targets(&cli, &config)?;
    if targets.is_empty() {
        anyhow::bail!("No targets: pass --target, --targets-file, or set watch.targets in config");
    }

    let executor = NmapExecutor::new(&config.nmap_path, config.probe_mode());
    let version = executor.verify_installation().await?;
    tracing::info!(nmap_version = %version.lines().next().unwrap_or("").trim(), "Nmap verified");

    let store = FileArtifactStore::new(&config.artifact_path);
    let session = ScanSession::new(executor, store, config.scan_timeout());

    match cli.command {
        Command::Diff => {
            let outcome = session.run(&targets).await?;
            let summary = outcome.diff.summary();

            let mut stdout = std::io::stdout().lock();
            for event in ChangeEvent::from_diff(outcome.session_id, &outcome.diff) {
                writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            }
            stdout.flush()?;

            tracing::info!(
                session_id = %outcome.session_id,
                previous_hosts = outcome.previous_hosts,
                current_hosts = outcome.current_hosts,
                exposed_hosts = summary.exposed_hosts,
                exposed_ports = summary.exposed_ports,
                closed_hosts = summary.closed_hosts,
                closed_ports = summary.closed_ports,
                warnings = outcome.warnings.len(),
                scan_ms = outcome.scan_duration.as_millis(),
                "Session complete"
            );
        }
        Command::Seed => {
            let outcome = session.seed(&targets).await?;
            tracing::info!(
                session_id = %outcome.session_id,
                hosts = outcome.hosts,
                warnings = outcome.warnings.len(),
                scan_ms = outcome.scan_duration.as_millis(),
                artifact_path = %config.artifact_path,
                "Baseline stored"
            );
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn apply_overrides(mut config: WatchConfig, cli: &Cli) -> WatchConfig {
    if let Some(interface) = &cli.interface {
        config.interface = Some(interface.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config.scan_timeout_secs = secs;
    }
    if let Some(path) = &cli.artifact_path {
        config.artifact_path = path.clone();
    }
    if config.probe_mode() != ProbeMode::Default {
        tracing::info!(mode = ?config.probe_mode(), "Probes bound to interface");
    }
    config
}

fn resolve_targets(cli: &Cli, config: &WatchConfig) -> anyhow::Result<Vec<HostAddress>> {
    let mut targets: Vec<String> = cli.targets.clone();
    if let Some(file) = &cli.targets_file {
        targets.extend(read_targets_file(Path::new(file))?);
    }
    if targets.is_empty() {
        targets = config.targets.clone();
    }
    Ok(targets.into_iter().map(HostAddress::from).collect())
}

fn read_targets_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading targets file {}", path.display()))?;
    Ok(parse_targets(&contents))
}

fn parse_targets(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
