// Bedroom grouper: cumulative per-bedroom-count views over the enriched
// table, for the tabbed per-bedroom display.

use std::collections::BTreeMap;

use crate::models::{Listing, ListingTable};

/// For each distinct bedroom count in the table, the view at threshold N
/// holds every listing with `bedrooms <= N`, sorted by revenue descending.
/// Ties keep their original relative order. Views are cumulative, so the
/// view for N=2 is a subset of the view for N=3. Rebuilt in full on every
/// call, never patched.
pub fn bedroom_views(table: &ListingTable) -> BTreeMap<u32, Vec<Listing>> {
    let mut views = BTreeMap::new();
    for listing in &table.listings {
        views.entry(listing.bedrooms).or_insert_with(Vec::new);
    }
    for (&threshold, view) in views.iter_mut() {
        let mut rows: Vec<Listing> = table
            .listings
            .iter()
            .filter(|l| l.bedrooms <= threshold)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
        *view = rows;
    }
    views
}
