// CSV ingestion: turns uploaded bytes into a ListingTable.
// Rows with an uncoercible star rating are a data-quality drop, not an error;
// undecodable content or missing columns abort the run.

use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{CompsError, CompsResult};
use crate::models::{Listing, ListingTable, REQUIRED_COLUMNS};

// Spreadsheet exports leak this literal into the rating column when a formula
// breaks upstream.
const RATING_ERROR_SENTINEL: &str = "#NAME?";

// Raw row as it appears in the upload. The rating stays a string here so a
// bad value drops the row instead of failing the whole parse.
#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(rename = "Link")]
    link: String,
    #[serde(rename = "Star Rating")]
    star_rating: String,
    #[serde(rename = "Reviews")]
    reviews: u32,
    #[serde(rename = "Revenue")]
    revenue: f64,
    #[serde(rename = "Occupancy")]
    occupancy: f64,
    #[serde(rename = "Active Nights")]
    active_nights: u32,
    #[serde(rename = "Bedrooms")]
    bedrooms: u32,
}

/// Parse a comps upload. The returned table is occupancy-normalized: raw
/// percentages have been divided by 100 exactly once.
///
/// Only the star-rating column is coerced leniently; a malformed value in any
/// other numeric column (Reviews, Revenue, Occupancy, Active Nights,
/// Bedrooms) aborts the whole upload as an input error rather than dropping
/// the row, so silently broken exports get surfaced instead of shrinking.
pub fn parse_comps(bytes: &[u8], filename: &str) -> CompsResult<ListingTable> {
    let text = std::str::from_utf8(bytes)?;
    let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());

    // Validate the header before touching any rows
    let headers = reader.headers()?.clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(CompsError::MissingColumn(required.to_string()));
        }
    }

    let mut listings = Vec::new();
    let mut dropped = 0usize;
    for raw in reader.deserialize::<RawListing>() {
        let raw = raw?;

        // Coerce the rating; uncoercible values (including the spreadsheet
        // error sentinel) drop the row silently.
        let rating = raw.star_rating.trim();
        if rating == RATING_ERROR_SENTINEL {
            dropped += 1;
            continue;
        }
        let star_rating = match rating.parse::<f64>() {
            Ok(r) => r,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };

        listings.push(Listing {
            link: raw.link,
            star_rating,
            reviews: raw.reviews,
            revenue: raw.revenue,
            occupancy: raw.occupancy,
            active_nights: raw.active_nights,
            bedrooms: raw.bedrooms,
            listing_title: None,
        });
    }

    if dropped > 0 {
        tracing::info!(
            filename,
            dropped,
            kept = listings.len(),
            "Dropped rows with non-numeric star rating"
        );
    }

    let mut table = ListingTable::new(listings);
    table.normalize_occupancy();
    Ok(table)
}

/// Parse an optional trends upload leniently into generic rows. Trends data
/// is persisted alongside the comps snapshot but not otherwise processed.
pub fn parse_trends(bytes: &[u8]) -> CompsResult<Vec<BTreeMap<String, String>>> {
    let text = std::str::from_utf8(bytes)?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
