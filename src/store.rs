// Per-market persistence. Each market is a directory under the markets root
// holding the raw upload snapshot and the processed pipeline output.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CompsResult;
use crate::models::{ListingTable, REQUIRED_COLUMNS};

pub const RAW_COMPS_FILE: &str = "raw_comps.csv";
pub const RAW_TRENDS_FILE: &str = "raw_trends.csv";
pub const PROCESSED_COMPS_FILE: &str = "processed_comps.csv";

pub struct MarketStore {
    root: PathBuf,
}

impl MarketStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn market_dir(&self, market: &str) -> PathBuf {
        self.root.join(market)
    }

    /// Create the market directory if it does not exist yet. Markets are
    /// created on first use and never deleted here.
    pub fn ensure_market(&self, market: &str) -> CompsResult<PathBuf> {
        let dir = self.market_dir(market);
        if !dir.exists() {
            tracing::info!(market, dir = %dir.display(), "Creating market directory");
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Persist the unmodified upload bytes under the market directory.
    pub fn save_raw(&self, market: &str, file_name: &str, bytes: &[u8]) -> CompsResult<PathBuf> {
        let dir = self.ensure_market(market)?;
        let path = dir.join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Write the processed table as CSV, unconditionally overwriting any
    /// prior snapshot at the same path.
    pub fn save_processed(&self, market: &str, table: &ListingTable) -> CompsResult<PathBuf> {
        let dir = self.ensure_market(market)?;
        let path = dir.join(PROCESSED_COMPS_FILE);
        let mut writer = csv::Writer::from_path(&path)?;
        if table.is_empty() {
            // serde only emits the header alongside the first row; keep the
            // snapshot well-formed when nothing qualified
            let mut header: Vec<&str> = REQUIRED_COLUMNS.to_vec();
            header.push("Listing Title");
            writer.write_record(&header)?;
        }
        for listing in &table.listings {
            writer.serialize(listing)?;
        }
        writer.flush()?;
        tracing::info!(market, rows = table.len(), path = %path.display(), "Saved processed comps");
        Ok(path)
    }

    /// Names of all existing market directories, sorted. Creates the markets
    /// root on first call.
    pub fn list_markets(&self) -> CompsResult<Vec<String>> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        let mut markets = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                markets.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        markets.sort();
        Ok(markets)
    }
}
