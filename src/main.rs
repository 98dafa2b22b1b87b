mod clean;
mod crawl;
mod db;
mod dedup;
mod error;
mod fetcher;
mod model;
mod parser;
mod pipeline;
mod settings;
mod stats;
mod tracker;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::crawl::CrawlLimits;
use crate::error::FailureKind;
use crate::fetcher::{FetchConfig, HttpFetcher};
use crate::parser::TenderParser;
use crate::pipeline::TenderScraper;
use crate::settings::Settings;
use crate::stats::RunStats;
use crate::tracker::{RunStatus, RunTracker};

#[derive(Parser)]
#[command(name = "tender_scraper", about = "Tender listing scraper for nProcure")]
struct Cli {
    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages, clean and store tenders
    Run(RunArgs),
    /// Number of stored tenders
    Stats,
    /// Most recently published stored tenders
    Recent {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Print one stored tender as JSON
    Show { tender_id: String },
    /// Recent scraper runs
    Runs {
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Args, Serialize)]
struct RunArgs {
    /// Requests per second; 0 disables the limit
    #[arg(long, default_value = "1.0", value_parser = non_negative)]
    rate_limit: f64,
    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value = "30")]
    timeout_secs: u64,
    /// Extra attempts on HTTP 429 and 5xx
    #[arg(long, default_value = "3")]
    retries: u32,
    /// Stop after this many tenders
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,
    /// Listing pages to walk at most
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,
    #[arg(long, default_value = "https://tender.nprocure.com")]
    base_url: String,
    /// Database file (overrides settings)
    #[arg(long)]
    db: Option<PathBuf>,
}

fn non_negative(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("{s} is not a number"))?;
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{s} must be zero or positive"));
    }
    if v > 0.0 && Duration::try_from_secs_f64(1.0 / v).is_err() {
        return Err(format!("{s} is too small a rate"));
    }
    Ok(v)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let settings = Settings::load()?;

    match cli.command {
        Commands::Run(args) => run(&settings, args).await,
        Commands::Stats => {
            let conn = open_db(&settings.database_path)?;
            let total = db::count_tenders(&conn, &settings.source)?;
            println!("Source:  {}", settings.source);
            println!("Tenders: {}", total);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Recent { limit } => {
            let conn = open_db(&settings.database_path)?;
            let rows = db::fetch_recent(&conn, &settings.source, limit)?;
            if rows.is_empty() {
                println!("No tenders stored yet. Run 'run' first.");
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "{:>3} | {:<16} | {:<8} | {:<10} | {:<28} | {}",
                "#", "Tender", "Type", "Published", "Organization", "Title"
            );
            println!("{}", "-".repeat(110));
            for (i, t) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<16} | {:<8} | {:<10} | {:<28} | {}",
                    i + 1,
                    truncate(&t.tender_id, 16),
                    t.tender_type,
                    t.publish_date,
                    truncate(&t.organization, 28),
                    truncate(&t.title, 40)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { tender_id } => {
            let conn = open_db(&settings.database_path)?;
            match db::fetch_tender(&conn, &settings.source, &tender_id)? {
                Some(t) => {
                    println!("{}", serde_json::to_string_pretty(&t)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("Tender {} not found", tender_id);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Runs { limit } => {
            let conn = open_db(&settings.database_path)?;
            let runs = db::fetch_runs(&conn, limit)?;
            if runs.is_empty() {
                println!("No runs recorded.");
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "{:<8} | {:<20} | {:<9} | {:>8} | {:>5} | {:>6} | {:>5} | {:>5} | {:>5}",
                "Run", "Started", "Status", "Duration", "Pages", "Parsed", "Saved", "Dups", "Fails"
            );
            println!("{}", "-".repeat(96));
            for r in &runs {
                let duration = r
                    .duration_seconds
                    .map(|s| format_duration(Duration::from_secs_f64(s.max(0.0))))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<8} | {:<20} | {:<9} | {:>8} | {:>5} | {:>6} | {:>5} | {:>5} | {:>5}",
                    truncate_plain(&r.run_id, 8),
                    r.start_time,
                    r.status,
                    duration,
                    r.pages_visited,
                    r.tenders_parsed,
                    r.tenders_saved,
                    r.deduped_count,
                    r.failures
                );
                if r.failures > 0 && r.error_summary != "{}" {
                    println!("         errors: {}", r.error_summary);
                }
                if r.classification_defaults > 0 {
                    println!("         types defaulted: {}", r.classification_defaults);
                }
            }
            println!("\nversion {}", runs[0].scraper_version);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Serialize)]
struct RunConfig<'a> {
    #[serde(flatten)]
    args: &'a RunArgs,
    source: &'a str,
    database_path: &'a PathBuf,
}

async fn run(settings: &Settings, args: RunArgs) -> Result<ExitCode> {
    let t0 = Instant::now();
    let db_path = args.db.clone().unwrap_or_else(|| settings.database_path.clone());
    let conn = open_db(&db_path)?;

    let fetcher = HttpFetcher::new(&FetchConfig {
        base_url: args.base_url.clone(),
        requests_per_second: args.rate_limit,
        timeout: Duration::from_secs(args.timeout_secs),
        max_retries: args.retries,
        user_agent: settings.user_agent.clone(),
    })?;
    let parser = TenderParser::new(&args.base_url)
        .with_context(|| format!("Invalid base URL: {}", args.base_url))?;

    let tracker = RunTracker::new(&conn);
    tracker.start(&RunConfig {
        args: &args,
        source: &settings.source,
        database_path: &db_path,
    });

    let scraper = TenderScraper {
        fetcher,
        parser,
        conn: &conn,
        source: settings.source.clone(),
        limits: CrawlLimits {
            max_pages: args.max_pages as usize,
            limit: args.limit.map(|n| n as usize),
        },
    };
    info!(
        "Scraping {} (max {} pages, limit {:?})",
        args.base_url, args.max_pages, args.limit
    );

    let mut stats = RunStats::default();
    let finished = tokio::select! {
        result = scraper.run(&mut stats) => Some(result),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    let status = match finished {
        Some(Ok(status)) => status,
        Some(Err(e)) => {
            error!("Fatal error: {:#}", e);
            stats.record_failure(FailureKind::Fatal);
            RunStatus::Failed
        }
        None => {
            warn!("Interrupted, recording run as failed");
            RunStatus::Failed
        }
    };

    tracker.complete(status, &stats);
    println!();
    stats.print();
    println!(
        "Run {} {} in {}",
        tracker.run_id(),
        status,
        format_duration(t0.elapsed())
    );

    Ok(match status {
        RunStatus::Completed => ExitCode::SUCCESS,
        RunStatus::Failed => ExitCode::FAILURE,
    })
}

fn open_db(path: &std::path::Path) -> Result<rusqlite::Connection> {
    let conn = db::connect(path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn truncate_plain(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
