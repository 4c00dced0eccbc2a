// Data structures shared across the pipeline stages.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Sentinel title for listings whose page could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

// One row of the comps table. Field names are renamed to the CSV headers the
// PriceLabs export uses, so serde handles both reading and writing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Listing {
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Star Rating")]
    pub star_rating: f64,
    #[serde(rename = "Reviews")]
    pub reviews: u32,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    // Raw percentage on input; a fraction in [0,1] once the table is normalized
    #[serde(rename = "Occupancy")]
    pub occupancy: f64,
    #[serde(rename = "Active Nights")]
    pub active_nights: u32,
    #[serde(rename = "Bedrooms")]
    pub bedrooms: u32,
    #[serde(rename = "Listing Title")]
    pub listing_title: Option<String>,
}

impl Listing {
    /// Whether enrichment has already attached a real title to this row.
    pub fn has_resolved_title(&self) -> bool {
        matches!(&self.listing_title, Some(t) if t != NOT_AVAILABLE)
    }
}

// An ordered sequence of listings from a single upload. The table is owned by
// one processing run and mutated in place through each stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    pub listings: Vec<Listing>,
    // Occupancy arrives as a raw percentage and must be divided by 100
    // exactly once. The flag makes that division idempotent.
    occupancy_normalized: bool,
}

impl ListingTable {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            occupancy_normalized: false,
        }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn is_normalized(&self) -> bool {
        self.occupancy_normalized
    }

    /// Convert raw occupancy percentages to fractions. No-op on a table that
    /// has already been normalized, so callers cannot double-divide.
    pub fn normalize_occupancy(&mut self) {
        if self.occupancy_normalized {
            return;
        }
        for listing in &mut self.listings {
            listing.occupancy /= 100.0;
        }
        self.occupancy_normalized = true;
    }

    /// Keep only listings satisfying the predicate, preserving order and the
    /// normalization state.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Listing) -> bool,
    {
        self.listings.retain(f);
    }

    /// Stable sort by revenue, highest first. Ties keep their original order.
    pub fn sort_by_revenue_desc(&mut self) {
        self.listings
            .sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    }

    /// Field -> value maps, one per listing, as consumed by the presentation
    /// layer. Map iteration order is alphabetical; the column-descriptor list
    /// carries the display order.
    pub fn rows(&self) -> Vec<BTreeMap<String, Value>> {
        self.listings
            .iter()
            .map(|l| {
                BTreeMap::from([
                    ("Link".to_string(), json!(l.link)),
                    ("Star Rating".to_string(), json!(l.star_rating)),
                    ("Reviews".to_string(), json!(l.reviews)),
                    ("Revenue".to_string(), json!(l.revenue)),
                    ("Occupancy".to_string(), json!(l.occupancy)),
                    ("Active Nights".to_string(), json!(l.active_nights)),
                    ("Bedrooms".to_string(), json!(l.bedrooms)),
                    (
                        "Listing Title".to_string(),
                        json!(l.listing_title.as_deref().unwrap_or(NOT_AVAILABLE)),
                    ),
                ])
            })
            .collect()
    }
}

/// The columns every upload must carry, in their canonical order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Link",
    "Star Rating",
    "Reviews",
    "Revenue",
    "Occupancy",
    "Active Nights",
    "Bedrooms",
];

// Column metadata handed to the presentation layer alongside the row data.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub semantic_type: String,
    /// Rendering hint; the title column is marked "markdown" so a front end
    /// can linkify it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<String>,
}

/// Descriptors for the processed table: every input column plus the title.
pub fn column_descriptors() -> Vec<ColumnDescriptor> {
    let mut columns: Vec<ColumnDescriptor> = REQUIRED_COLUMNS
        .iter()
        .map(|name| {
            let numeric = !matches!(*name, "Link");
            ColumnDescriptor {
                name: (*name).to_string(),
                id: (*name).to_string(),
                semantic_type: if numeric { "numeric" } else { "text" }.to_string(),
                presentation: None,
            }
        })
        .collect();
    columns.push(ColumnDescriptor {
        name: "Listing Title".to_string(),
        id: "Listing Title".to_string(),
        semantic_type: "text".to_string(),
        presentation: Some("markdown".to_string()),
    });
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(link: &str, revenue: f64, bedrooms: u32) -> Listing {
        Listing {
            link: link.to_string(),
            star_rating: 4.8,
            reviews: 20,
            revenue,
            occupancy: 45.0,
            active_nights: 200,
            bedrooms,
            listing_title: None,
        }
    }

    #[test]
    fn test_normalize_occupancy_is_applied_once() {
        let mut table = ListingTable::new(vec![listing("https://example/a", 15000.0, 3)]);
        table.normalize_occupancy();
        assert_eq!(table.listings[0].occupancy, 0.45);
        // Second call must not divide again
        table.normalize_occupancy();
        assert_eq!(table.listings[0].occupancy, 0.45);
        assert!(table.is_normalized());
    }

    #[test]
    fn test_sort_by_revenue_desc_is_stable() {
        let mut table = ListingTable::new(vec![
            listing("https://example/a", 10000.0, 2),
            listing("https://example/b", 20000.0, 2),
            listing("https://example/c", 10000.0, 2),
        ]);
        table.sort_by_revenue_desc();
        let links: Vec<&str> = table.listings.iter().map(|l| l.link.as_str()).collect();
        // Ties (a, c) keep their original relative order
        assert_eq!(
            links,
            vec!["https://example/b", "https://example/a", "https://example/c"]
        );
    }

    #[test]
    fn test_column_descriptors_mark_title_as_markdown() {
        let columns = column_descriptors();
        assert_eq!(columns.len(), 8);
        let title = columns.last().unwrap();
        assert_eq!(title.id, "Listing Title");
        assert_eq!(title.presentation.as_deref(), Some("markdown"));
        assert!(columns[0].presentation.is_none());
    }

    #[test]
    fn test_column_descriptor_serialized_shape() {
        let columns = column_descriptors();
        let title = serde_json::to_value(columns.last().unwrap()).unwrap();
        assert_eq!(
            title,
            json!({
                "name": "Listing Title",
                "id": "Listing Title",
                "type": "text",
                "presentation": "markdown",
            })
        );
        // Columns without a rendering hint omit the key entirely
        let link = serde_json::to_value(&columns[0]).unwrap();
        assert_eq!(
            link,
            json!({
                "name": "Link",
                "id": "Link",
                "type": "text",
            })
        );
    }

    #[test]
    fn test_rows_substitute_sentinel_for_missing_title() {
        let table = ListingTable::new(vec![listing("https://example/a", 15000.0, 3)]);
        let rows = table.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Listing Title"], json!(NOT_AVAILABLE));
        assert_eq!(rows[0]["Link"], json!("https://example/a"));
    }

    #[test]
    fn test_row_keys_match_column_descriptor_ids() {
        // The maps are keyed by column id; descriptors carry the display order
        let table = ListingTable::new(vec![listing("https://example/a", 15000.0, 3)]);
        let rows = table.rows();
        let mut keys: Vec<&str> = rows[0].keys().map(|k| k.as_str()).collect();
        let mut ids: Vec<String> = column_descriptors().into_iter().map(|c| c.id).collect();
        keys.sort_unstable();
        ids.sort_unstable();
        assert_eq!(keys, ids);
    }
}
