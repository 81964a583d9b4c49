//! site-pulse CLI - Compare a site's Core Web Vitals against its competitors

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use site_pulse::{
    config::Config,
    monitor::Monitor,
    provider::PageSpeedClient,
    render::Renderer,
    storage::{JsonFileRepository, Repository},
};

/// site-pulse: competitive performance monitoring
#[derive(Parser, Debug)]
#[command(name = "site-pulse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Measure all sites, save the report and deliver it
    Run(RunArgs),

    /// Show stored snapshots of one site
    History(HistoryArgs),

    /// Print the most recently saved report
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "site-pulse.toml")]
    config: PathBuf,

    /// PageSpeed Insights API key
    #[arg(long, env = "PAGESPEED_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Collect and render, but do not save or deliver
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Parser, Debug)]
struct HistoryArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "site-pulse.toml")]
    config: PathBuf,

    /// Site id to show
    #[arg(short, long)]
    site: String,

    /// Number of recent snapshots to show
    #[arg(short, long, default_value = "10")]
    limit: usize,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Path to the configuration file
    #[arg(short, long, default_value = "site-pulse.toml")]
    config: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "markdown", value_parser = ["markdown", "html", "json"])]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::History(args) => history_command(args),
        Commands::Show(args) => show_command(args),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load configuration {:?}", path))
}

/// Full workflow: collect, compare, save, deliver
async fn run_command(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    info!(
        "Monitoring {} site(s) with the {} strategy",
        config.sites.len(),
        config.strategy.as_str()
    );

    if args.api_key.is_none() {
        warn!("No PageSpeed API key given; requests are subject to anonymous quotas");
    }

    let client = PageSpeedClient::new(
        args.api_key,
        Duration::from_secs(config.collector.request_timeout_secs),
    )
    .context("Failed to create PageSpeed client")?;

    let monitor = Monitor::from_config(&config, Arc::new(client))
        .context("Failed to set up the monitor")?;

    let outcome = monitor.run(args.dry_run).await.context("Run failed")?;

    if args.dry_run {
        println!("{}", outcome.rendered.text);
    }

    let report = &outcome.report;
    info!(
        "Leading in {}, trailing in {} comparison(s); {} recommendation(s)",
        report.leading_count(),
        report.trailing_count(),
        report.recommendations.len()
    );
    if report.has_missing_competitors() {
        warn!(
            "Missing competitors: {}",
            report
                .missing_competitors
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}

/// Show stored snapshots of one site, newest first
fn history_command(args: HistoryArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    if !config.sites.iter().any(|s| s.id == args.site) {
        anyhow::bail!("Site '{}' is not configured", args.site);
    }

    let repository = JsonFileRepository::new(&config.storage.path, config.storage.max_items);
    let snapshots = repository
        .load_history(&args.site, args.limit)
        .with_context(|| "Failed to load history")?;

    if snapshots.is_empty() {
        println!("No history for '{}'", args.site);
        return Ok(());
    }

    println!("## {}\n", args.site);
    println!("| Date | Performance | LCP | CLS |");
    println!("|------|-------------|-----|-----|");
    for snapshot in snapshots {
        println!(
            "| {} | {} | {:.2} s | {:.4} |",
            snapshot.captured_at.format("%Y-%m-%d %H:%M UTC"),
            snapshot.performance_score,
            snapshot.lcp_seconds,
            snapshot.cls_score
        );
    }

    Ok(())
}

/// Print the latest saved report
fn show_command(args: ShowArgs) -> Result<()> {
    let config = load_config(&args.config)?;

    let repository = JsonFileRepository::new(&config.storage.path, config.storage.max_items);
    let report = repository
        .latest_report()
        .with_context(|| "Failed to load history")?
        .ok_or_else(|| anyhow::anyhow!("No report saved in {:?}", repository.path()))?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        format => {
            let rendered = Renderer::new()?.render(&report, &config.sites)?;
            if format == "html" {
                println!("{}", rendered.html);
            } else {
                println!("{}", rendered.text);
            }
        }
    }

    Ok(())
}
