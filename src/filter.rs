// Threshold filter: five independent predicates, AND-combined.

use serde::Deserialize;

use crate::models::{Listing, ListingTable};

// Scalar thresholds a listing must meet to qualify as a comp. Deserialized
// from configuration; min_occupancy is a fraction in [0,1].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    pub min_rating: f64,
    pub min_reviews: u32,
    pub min_revenue: f64,
    pub min_occupancy: f64,
    pub min_active_nights: u32,
}

impl Thresholds {
    fn matches(&self, listing: &Listing) -> bool {
        listing.star_rating >= self.min_rating
            && listing.reviews >= self.min_reviews
            && listing.revenue >= self.min_revenue
            && listing.occupancy >= self.min_occupancy
            && listing.active_nights >= self.min_active_nights
    }
}

/// Return the subsequence of listings satisfying all five thresholds,
/// preserving order. An empty result is valid. The input table must carry
/// normalized occupancy; normalization is flag-guarded, so applying the
/// filter to its own output never re-divides.
pub fn apply(table: &ListingTable, thresholds: &Thresholds) -> ListingTable {
    debug_assert!(
        table.is_normalized(),
        "threshold filter expects occupancy as a fraction"
    );
    let mut filtered = table.clone();
    filtered.retain(|l| thresholds.matches(l));
    tracing::debug!(
        input = table.len(),
        output = filtered.len(),
        "Applied threshold filter"
    );
    filtered
}
