//! Newswire-Ingest main entry point
//!
//! This is the command-line interface for the news-wire ingestion pipeline.

use clap::Parser;
use newswire_ingest::config::{load_config_with_hash, Config};
use newswire_ingest::crawler::CrawlerController;
use newswire_ingest::dedup;
use newswire_ingest::output;
use newswire_ingest::storage::{lock_storage, open_storage, SharedStorage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Newswire-Ingest: a news-wire ingestion pipeline
///
/// Pulls articles from a news-wire API on a schedule, extracts full text,
/// normalizes taxonomy codes, detects duplicate stories and persists
/// canonical records.
#[derive(Parser, Debug)]
#[command(name = "newswire-ingest")]
#[command(version = "1.0.0")]
#[command(about = "A news-wire ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run a single crawl cycle and exit
    #[arg(long, group = "mode")]
    once: bool,

    /// Scan stored records for near-duplicates and exit
    #[arg(long, group = "mode")]
    scan_duplicates: bool,

    /// Merge a pending duplicate group, keeping the most recently published member
    #[arg(long, value_name = "GROUP", group = "mode")]
    auto_merge: Option<i64>,

    /// Mark a pending duplicate group as distinct stories
    #[arg(long, value_name = "GROUP", group = "mode")]
    ignore_group: Option<i64>,

    /// Show statistics from the database and exit
    #[arg(long, group = "mode")]
    stats: bool,

    /// Validate config and show what would be ingested without fetching anything
    #[arg(long, group = "mode")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.output.database_path))?;

    if cli.stats {
        handle_stats(&storage)?;
    } else if cli.scan_duplicates {
        handle_scan(&config, &storage)?;
    } else if let Some(group_id) = cli.auto_merge {
        handle_auto_merge(&storage, group_id)?;
    } else if let Some(group_id) = cli.ignore_group {
        handle_ignore(&storage, group_id)?;
    } else if cli.once {
        handle_once(&config, storage).await?;
    } else {
        handle_schedule(&config, storage).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newswire_ingest=info,warn"),
            1 => EnvFilter::new("newswire_ingest=debug,info"),
            2 => EnvFilter::new("newswire_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Newswire-Ingest Dry Run ===\n");

    println!("Wire:");
    println!("  Base URL: {}", config.wire.base_url);
    println!("  Username: {}", config.wire.username);
    println!("  Document format: {}", config.wire.document_format);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    let crawl = &config.crawl;
    println!("\nCrawl:");
    println!("  Interval: {} minutes", crawl.interval_minutes);
    println!("  Run immediately: {}", crawl.run_immediately);
    println!("  Batch size: {}", crawl.batch_size);
    println!("  Save strategy: {:?}", crawl.save_strategy);
    println!("  Auto-publish: {}", crawl.auto_publish);
    println!("  Duplicate check: {}", crawl.enable_duplicate_check);
    println!("  AI enhancement: {}", crawl.enable_ai);
    println!("  Photo search: {}", crawl.enable_photo_search);
    println!("  Source: {}", crawl.source);

    println!("\nCategories ({}):", crawl.categories.len());
    for &category in &crawl.categories {
        let languages: Vec<String> = crawl
            .languages_for(category)
            .iter()
            .map(|l| l.to_string())
            .collect();
        println!(
            "  - {} ({}) languages [{}]",
            category,
            newswire_ingest::normalize::map_category(Some(category)).label(),
            languages.join(", ")
        );
    }

    println!("\nRate Limits:");
    println!("  Search interval: {}ms", config.rate_limit.search_interval_ms);
    println!(
        "  Document interval: {}ms",
        config.rate_limit.document_interval_ms
    );
    println!(
        "  Max items per request: {}",
        config.rate_limit.max_items_per_request
    );
    println!(
        "  Retries: {} (delay {}ms)",
        config.rate_limit.max_retries, config.rate_limit.retry_delay_ms
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(storage: &SharedStorage) -> Result<(), Box<dyn std::error::Error>> {
    let guard = lock_storage(storage)?;
    let stats = guard.get_store_stats()?;
    let latest = guard.get_latest_run()?;
    output::print_store_stats(&stats, latest.as_ref());
    Ok(())
}

/// Handles the --scan-duplicates mode
fn handle_scan(config: &Config, storage: &SharedStorage) -> Result<(), Box<dyn std::error::Error>> {
    let mut guard = lock_storage(storage)?;
    let report = dedup::scan_duplicates(&mut *guard, &config.duplicates)?;
    output::print_scan_report(&report);
    Ok(())
}

/// Handles the --auto-merge mode
fn handle_auto_merge(
    storage: &SharedStorage,
    group_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut guard = lock_storage(storage)?;
    match dedup::auto_merge_by_recency(&mut *guard, group_id) {
        Ok(group) => {
            println!(
                "✓ Group {} merged, kept record {}",
                group.id,
                group
                    .keep_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Merge of group {} failed: {}", group_id, e);
            Err(e.into())
        }
    }
}

/// Handles the --ignore-group mode
fn handle_ignore(storage: &SharedStorage, group_id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let mut guard = lock_storage(storage)?;
    dedup::ignore(&mut *guard, group_id)?;
    println!("✓ Group {} marked as distinct stories", group_id);
    Ok(())
}

/// Handles the --once mode: one manual cycle
async fn handle_once(
    config: &Config,
    storage: SharedStorage,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = CrawlerController::from_config(config, storage)?;
    match controller.manual_trigger().await {
        Ok(report) => {
            output::print_cycle_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl cycle failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the default mode: scheduled cycles until Ctrl-C
async fn handle_schedule(
    config: &Config,
    storage: SharedStorage,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Categories: {}, interval: {} minutes",
        config.crawl.categories.len(),
        config.crawl.interval_minutes
    );

    let controller = CrawlerController::from_config(config, storage)?;
    controller.start(config.crawl.clone())?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, waiting for the current cycle to finish");

    controller.stop();
    controller.join().await;

    output::print_status(&controller.get_status());
    Ok(())
}
