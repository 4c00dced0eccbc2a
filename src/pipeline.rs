// Pipeline orchestration: one upload event in, one processed snapshot out.
// raw save -> parse -> threshold filter -> title enrichment -> drop "N/A"
// -> sort by revenue -> persist -> derived bedroom views.

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Settings;
use crate::enrich::{self, TitleFetcher};
use crate::filter;
use crate::grouping;
use crate::ingest;
use crate::models::{ColumnDescriptor, Listing, column_descriptors};
use crate::store::{MarketStore, RAW_COMPS_FILE, RAW_TRENDS_FILE};

/// One upload event from the presentation layer.
pub struct ProcessRequest {
    pub market: String,
    pub comps_bytes: Vec<u8>,
    pub comps_filename: String,
    /// Optional market-trends upload, persisted alongside the comps snapshot.
    pub trends: Option<TrendsUpload>,
}

pub struct TrendsUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// What the presentation layer gets back from a successful run.
pub struct ProcessOutcome {
    pub message: String,
    pub rows: Vec<BTreeMap<String, Value>>,
    pub columns: Vec<ColumnDescriptor>,
    pub bedroom_views: BTreeMap<u32, Vec<Listing>>,
    pub processed_path: PathBuf,
}

/// Run the full comps pipeline for one upload. Input and orchestration
/// errors abort the run; nothing beyond the raw snapshot is persisted on
/// failure. Per-record enrichment failures never escalate.
pub async fn run(
    request: &ProcessRequest,
    settings: &Settings,
    fetcher: &TitleFetcher,
) -> Result<ProcessOutcome> {
    let market = request.market.trim();
    anyhow::ensure!(!market.is_empty(), "market name must not be empty");

    let store = MarketStore::new(&settings.markets_dir);

    // Snapshot the raw uploads before parsing, as received
    store
        .save_raw(market, RAW_COMPS_FILE, &request.comps_bytes)
        .context("failed to save raw comps upload")?;
    if let Some(trends) = &request.trends {
        store
            .save_raw(market, RAW_TRENDS_FILE, &trends.bytes)
            .context("failed to save raw trends upload")?;
        // Trends data is validated but not otherwise processed
        let trend_rows = ingest::parse_trends(&trends.bytes)
            .with_context(|| format!("failed to parse trends file '{}'", trends.filename))?;
        tracing::info!(market, rows = trend_rows.len(), "Stored market trends upload");
    }

    let table = ingest::parse_comps(&request.comps_bytes, &request.comps_filename)
        .with_context(|| format!("failed to parse comps file '{}'", request.comps_filename))?;
    tracing::info!(market, rows = table.len(), "Parsed comps upload");

    let mut filtered = filter::apply(&table, &settings.thresholds);
    tracing::info!(
        market,
        qualifying = filtered.len(),
        "Applied quality thresholds"
    );

    fetcher.enrich_titles(&mut filtered).await;
    enrich::drop_unresolved(&mut filtered);

    filtered.sort_by_revenue_desc();

    let processed_path = store
        .save_processed(market, &filtered)
        .context("failed to save processed comps")?;

    let bedroom_views = grouping::bedroom_views(&filtered);
    let market_dir = store.market_dir(market);
    let message = format!(
        "Comps data has been uploaded and processed. Results saved in '{}'.",
        market_dir.display()
    );

    Ok(ProcessOutcome {
        message,
        rows: filtered.rows(),
        columns: column_descriptors(),
        bedroom_views,
        processed_path,
    })
}

/// Trim helper for a quick per-view summary line.
pub fn view_summary(threshold: u32, view: &[Listing]) -> String {
    match view.first() {
        Some(top) => format!(
            "<= {} bedrooms: {} listings, top revenue {:.0}",
            threshold,
            view.len(),
            top.revenue
        ),
        None => format!("<= {} bedrooms: no listings", threshold),
    }
}
