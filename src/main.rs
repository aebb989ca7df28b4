//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest scraper.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::output::{load_statistics, print_statistics};
use catalog_harvest::pipeline::run_harvest_over_http;
use catalog_harvest::storage::SqliteStorage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a batched catalog scraper
///
/// Catalog-Harvest walks paginated listing pages, collects every linked item
/// page, fetches them in paced batches under a bounded worker pool and writes
/// one CSV row per item.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version)]
#[command(about = "A batched catalog scraper", long_about = None)]
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

    /// Validate config and show which listing pages would be fetched
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run stored in the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the configuration and the listing pages
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Harvester:");
    println!("  Workers: {}", config.harvester.workers);
    println!("  Batch size: {}", config.harvester.batch_size);
    println!("  Pause between batches: {}ms", config.harvester.batch_pause_ms);
    println!("  Request timeout: {}s", config.harvester.request_timeout_secs);

    println!("\nClient:");
    println!("  User agent: {}", config.client.user_agent);
    println!("  Connect timeout: {}s", config.client.connect_timeout_secs);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    if let Some(path) = &config.output.failure_log_path {
        println!("  Failure log: {}", path);
    }
    if let Some(path) = &config.output.database_path {
        println!("  Database: {}", path);
    }
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }

    println!("\nListings ({}):", config.listings.len());
    for listing in &config.listings {
        println!("  - {} ({} pages)", listing.template, listing.pages);
        for url in listing.page_urls() {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch {} listing pages",
        config.total_listing_pages()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let database_path = config
        .output
        .database_path
        .as_deref()
        .context("--stats requires output.database-path to be set")?;

    println!("Database: {}\n", database_path);

    let storage = SqliteStorage::new(Path::new(database_path))
        .with_context(|| format!("Failed to open database {}", database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Listings: {}, listing pages: {}, workers: {}, batch size: {}",
        config.listings.len(),
        config.total_listing_pages(),
        config.harvester.workers,
        config.harvester.batch_size
    );

    match run_harvest_over_http(config, config_hash).await {
        Ok(run) => {
            tracing::info!(
                "Harvest completed: {} records written to {}",
                run.summary.records,
                config.output.dataset_path
            );
            if !run.failures.is_empty() {
                tracing::warn!("{} URLs could not be harvested", run.failures.len());
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
