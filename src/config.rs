// Configuration loading via the 'config' crate and 'dotenv'.
// The filter thresholds live here, passed explicitly into the pipeline —
// no module-level mutable constants.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::filter::Thresholds;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root directory under which per-market data is persisted.
    pub markets_dir: String,
    /// Quality/performance thresholds applied to every comps upload.
    pub thresholds: Thresholds,
    /// Per-fetch timeout for title enrichment requests, in seconds.
    pub fetch_timeout_secs: u64,
    /// Maximum number of title fetches in flight at once.
    pub max_concurrent_fetches: usize,
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            // Defaults match the thresholds the original analysis used
            .set_default("markets_dir", "Markets")?
            .set_default("thresholds.min_rating", 4.5)?
            .set_default("thresholds.min_reviews", 10)?
            .set_default("thresholds.min_revenue", 10000.0)?
            // Occupancy threshold is a fraction; uploads carry raw percentages
            .set_default("thresholds.min_occupancy", 0.30)?
            .set_default("thresholds.min_active_nights", 180)?
            .set_default("fetch_timeout_secs", 15)?
            .set_default("max_concurrent_fetches", 16)?
            // Load from a configuration file (e.g., comps.toml)
            .add_source(File::with_name("comps").required(false))
            // Load from environment variables (e.g., COMPS__MARKETS_DIR)
            .add_source(Environment::with_prefix("COMPS").separator("__"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::new().expect("defaults should load");
        assert_eq!(settings.markets_dir, "Markets");
        assert_eq!(settings.thresholds.min_rating, 4.5);
        assert_eq!(settings.thresholds.min_reviews, 10);
        assert_eq!(settings.thresholds.min_revenue, 10000.0);
        assert_eq!(settings.thresholds.min_occupancy, 0.30);
        assert_eq!(settings.thresholds.min_active_nights, 180);
        assert!(settings.max_concurrent_fetches > 0);
    }
}
