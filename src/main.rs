//! Deal Crawler main entry point
//!
//! This is the command-line interface for the deal crawler: batch crawls,
//! the HTTP crawl service, and dataset inspection and export.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use deal_crawler::config::{load_config_or_default, Config};
use deal_crawler::crawler::Coordinator;
use deal_crawler::dataset::{open_dataset, DatasetStore};
use deal_crawler::output::{analyze_store, export_dataset, print_analysis, print_run_stats, print_runs};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Deal Crawler: a configurable deal-extraction web crawler
///
/// Crawls a site from its start URLs, extracts deal records with CSS
/// selectors from the configuration, and stores every page result in a
/// dataset that can be analyzed and exported.
#[derive(Parser, Debug)]
#[command(name = "deal-crawler")]
#[command(version)]
#[command(about = "A configurable deal-extraction web crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a crawl and store the results in the dataset
    Crawl {
        #[command(flatten)]
        config: ConfigArgs,

        /// Override the request budget
        #[arg(long)]
        max_requests: Option<u32>,

        /// Clear the dataset before crawling
        #[arg(long)]
        fresh: bool,
    },

    /// Serve the HTTP crawl API
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Show dataset statistics and recorded runs
    Stats {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Export the dataset as JSON and CSV
    Export {
        #[command(flatten)]
        config: ConfigArgs,

        /// Directory the export files are written to
        #[arg(long, default_value = "./export")]
        out_dir: PathBuf,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Named profile to apply on top of the configuration
    #[arg(long, env = "DEAL_CRAWLER_ENV")]
    profile: Option<String>,
}

impl ConfigArgs {
    /// Loads the configuration file (or defaults) and applies the profile
    fn load(&self) -> anyhow::Result<(Config, String)> {
        match &self.config {
            Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
            None => tracing::info!("No configuration file given, using defaults"),
        }

        let (config, hash) = load_config_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);

        let config = match &self.profile {
            Some(profile) => {
                tracing::info!("Applying profile: {}", profile);
                config.with_profile(profile)?
            }
            None => config,
        };

        Ok((config, hash))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Crawl {
            config,
            max_requests,
            fresh,
        } => {
            let (config, hash) = config.load()?;
            handle_crawl(config, hash, max_requests, fresh).await
        }
        Command::Serve { config, host, port } => {
            let (config, _) = config.load()?;
            deal_crawler::server::serve(config, &host, port).await
        }
        Command::Stats { config } => {
            let (config, _) = config.load()?;
            handle_stats(&config)
        }
        Command::Export { config, out_dir } => {
            let (config, _) = config.load()?;
            handle_export(&config, &out_dir)
        }
        Command::Config { config } => {
            let (config, _) = config.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("deal_crawler=info,warn"),
                1 => EnvFilter::new("deal_crawler=debug,info"),
                2 => EnvFilter::new("deal_crawler=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the main crawl operation
async fn handle_crawl(
    mut config: Config,
    config_hash: String,
    max_requests: Option<u32>,
    fresh: bool,
) -> anyhow::Result<()> {
    if let Some(max_requests) = max_requests {
        config.crawler.max_requests_per_crawl = max_requests;
    }

    tracing::info!(
        "Start URLs: {}, budget: {}, concurrency: {}",
        config.start_urls.len(),
        config.crawler.max_requests_per_crawl,
        config.crawler.max_concurrency
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight pages");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let outcome = Coordinator::new(config)
        .with_config_hash(config_hash)
        .with_cancel(cancel)
        .fresh(fresh)
        .run()
        .await
        .context("Crawl failed")?;

    print_run_stats(&outcome.stats);
    println!(
        "\nDataset: {} item(s), last modified {}",
        outcome.summary.item_count,
        outcome.summary.modified_at.to_rfc3339()
    );
    if outcome.cancelled {
        println!("Crawl was interrupted before the frontier was drained");
    }

    Ok(())
}

/// Handles the stats subcommand: analyzes the stored dataset
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Dataset: {}\n", config.output.dataset_path);

    let store = open_dataset(Path::new(&config.output.dataset_path))?;
    let analysis = analyze_store(&store)?;

    print_analysis(&analysis);
    print_runs(&store.runs()?);

    Ok(())
}

/// Handles the export subcommand
fn handle_export(config: &Config, out_dir: &Path) -> anyhow::Result<()> {
    println!("=== Exporting Dataset ===\n");
    println!("Dataset: {}", config.output.dataset_path);
    println!("Output: {}", out_dir.display());
    println!();

    let store = open_dataset(Path::new(&config.output.dataset_path))?;
    let results = store.results()?;
    let paths = export_dataset(&results, out_dir)?;

    println!("✓ Results: {}", paths.results_json.display());
    println!("✓ Deals: {}", paths.deals_json.display());
    println!("✓ CSV: {}", paths.deals_csv.display());

    Ok(())
}
