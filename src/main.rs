use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::fs;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::enrich::TitleFetcher;
use crate::pipeline::{ProcessRequest, TrendsUpload};
use crate::store::MarketStore;

// Declare modules
mod config;
mod enrich;
mod error;
mod filter;
mod grouping;
mod ingest;
mod models;
mod pipeline;
mod store;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

#[derive(Parser)]
#[command(name = "comps-analyzer", about = "Short-term-rental comps processing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a comps CSV export for a market
    Process {
        /// Market name the upload belongs to
        #[arg(long)]
        market: String,
        /// Path to the comps CSV export
        #[arg(long)]
        comps: PathBuf,
        /// Optional path to a market-trends CSV
        #[arg(long)]
        trends: Option<PathBuf>,
    },
    /// List markets that already have data
    Markets,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comps_analyzer=info".into()),
        )
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    match cli.command {
        Commands::Process {
            market,
            comps,
            trends,
        } => process_command(&settings, market, comps, trends).await,
        Commands::Markets => markets_command(&settings),
    }
}

async fn process_command(
    settings: &Settings,
    market: String,
    comps: PathBuf,
    trends: Option<PathBuf>,
) -> Result<()> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build shared reqwest client")?;
    let fetcher = TitleFetcher::new(
        client,
        Duration::from_secs(settings.fetch_timeout_secs),
        settings.max_concurrent_fetches,
    );

    let comps_bytes = fs::read(&comps)
        .with_context(|| format!("Failed to read comps file '{}'", comps.display()))?;
    let trends_upload = match trends {
        Some(path) => Some(TrendsUpload {
            bytes: fs::read(&path)
                .with_context(|| format!("Failed to read trends file '{}'", path.display()))?,
            filename: file_name_of(&path),
        }),
        None => None,
    };

    let request = ProcessRequest {
        market,
        comps_filename: file_name_of(&comps),
        comps_bytes,
        trends: trends_upload,
    };

    let outcome = match pipeline::run(&request, settings, &fetcher).await {
        Ok(o) => o,
        Err(e) => {
            // One visible failure message at the boundary; details go to logs
            tracing::error!("Pipeline run failed: {:?}", e);
            return Err(e.context("There was an error processing this file"));
        }
    };

    println!("{}", outcome.message);
    println!("{} qualifying listings:", outcome.rows.len());
    for row in &outcome.rows {
        println!(
            "  {} | revenue {} | {} bedrooms",
            row["Listing Title"].as_str().unwrap_or_default(),
            row["Revenue"],
            row["Bedrooms"]
        );
    }
    println!("By bedroom count:");
    for (threshold, view) in &outcome.bedroom_views {
        println!("  {}", pipeline::view_summary(*threshold, view));
    }
    Ok(())
}

fn markets_command(settings: &Settings) -> Result<()> {
    let store = MarketStore::new(&settings.markets_dir);
    let markets = store.list_markets().context("Failed to list markets")?;
    if markets.is_empty() {
        println!("No markets yet under '{}'.", settings.markets_dir);
    } else {
        for market in markets {
            println!("{market}");
        }
    }
    Ok(())
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
