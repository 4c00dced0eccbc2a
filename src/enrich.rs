// Title enrichment engine: concurrently resolves a display title for every
// listing URL and attaches it in place. Per-record failures resolve to the
// "N/A" sentinel and never abort the batch.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::Duration;

use crate::models::{ListingTable, NOT_AVAILABLE};

static OG_DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());

pub struct TitleFetcher {
    client: Client,
    /// Per-fetch timeout. An unbounded fetch would pin the whole batch on one
    /// stalled listing page.
    timeout: Duration,
    /// Cap on in-flight requests across the fan-out.
    max_concurrency: usize,
}

impl TitleFetcher {
    pub fn new(client: Client, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Resolve a title for every listing in the table, one fetch per row,
    /// at most `max_concurrency` in flight. Results are matched back to
    /// their row by position, so completion order is unobservable. Rows that
    /// already carry a resolved title are left untouched.
    pub async fn enrich_titles(&self, table: &mut ListingTable) {
        if table.is_empty() {
            return;
        }
        tracing::info!(listings = table.len(), "Starting title enrichment");

        let fetches = table.listings.iter().map(|listing| {
            let existing = match &listing.listing_title {
                Some(title) if title != NOT_AVAILABLE => Some(title.clone()),
                _ => None,
            };
            let url = listing.link.clone();
            async move {
                match existing {
                    Some(title) => title,
                    None => self.resolve_title(&url).await,
                }
            }
        });
        let titles: Vec<String> = stream::iter(fetches)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        for (listing, title) in table.listings.iter_mut().zip(titles) {
            listing.listing_title = Some(title);
        }
    }

    // Resolves a single URL, collapsing every failure mode into the sentinel.
    async fn resolve_title(&self, url: &str) -> String {
        match self.fetch_og_description(url).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                tracing::warn!(url, "No og:description meta tag in listing page");
                NOT_AVAILABLE.to_string()
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Title fetch failed");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    async fn fetch_og_description(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("non-success status")?;
        let body = response
            .text()
            .await
            .context("failed to read response body")?;
        Ok(extract_og_description(&body))
    }
}

// Pulls the content attribute of <meta property="og:description"> out of a
// listing page body.
fn extract_og_description(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    document
        .select(&OG_DESCRIPTION_SELECTOR)
        .next()
        .and_then(|tag| tag.value().attr("content"))
        .map(|content| content.to_string())
}

/// Remove listings whose title could not be resolved. Returns the number of
/// rows dropped. This silent removal is part of the pipeline contract.
pub fn drop_unresolved(table: &mut ListingTable) -> usize {
    let before = table.len();
    table.retain(|l| l.has_resolved_title());
    let dropped = before - table.len();
    if dropped > 0 {
        tracing::info!(dropped, kept = table.len(), "Dropped listings without a resolved title");
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Listing;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(link: &str) -> Listing {
        Listing {
            link: link.to_string(),
            star_rating: 4.8,
            reviews: 20,
            revenue: 15000.0,
            occupancy: 0.45,
            active_nights: 200,
            bedrooms: 3,
            listing_title: None,
        }
    }

    fn fetcher() -> TitleFetcher {
        TitleFetcher::new(Client::new(), Duration::from_secs(5), 8)
    }

    fn page_with_title(title: &str) -> String {
        format!(
            "<html><head><meta property=\"og:description\" content=\"{title}\" />\
             <title>ignored</title></head><body></body></html>"
        )
    }

    #[test]
    fn test_extract_og_description() {
        assert_eq!(
            extract_og_description(&page_with_title("Cozy Cottage")),
            Some("Cozy Cottage".to_string())
        );
        // Tag present but attribute missing
        assert_eq!(
            extract_og_description("<meta property=\"og:description\" />"),
            None
        );
        // Tag absent entirely
        assert_eq!(extract_og_description("<html><body>hi</body></html>"), None);
    }

    #[tokio::test]
    async fn test_enrich_attaches_fetched_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_with_title("Cozy Cottage")))
            .mount(&server)
            .await;

        let mut table = ListingTable::new(vec![listing(&format!("{}/a", server.uri()))]);
        fetcher().enrich_titles(&mut table).await;

        assert_eq!(
            table.listings[0].listing_title.as_deref(),
            Some("Cozy Cottage")
        );
    }

    #[tokio::test]
    async fn test_failures_resolve_to_sentinel_and_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/no-meta"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_with_title("Beach House")))
            .mount(&server)
            .await;

        let mut table = ListingTable::new(vec![
            listing(&format!("{}/error", server.uri())),
            listing(&format!("{}/no-meta", server.uri())),
            listing(&format!("{}/ok", server.uri())),
        ]);
        let fetcher = fetcher();
        fetcher.enrich_titles(&mut table).await;

        // Failures are localized to their record
        assert_eq!(table.listings[0].listing_title.as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(table.listings[1].listing_title.as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(table.listings[2].listing_title.as_deref(), Some("Beach House"));

        let enriched_len = table.len();
        let dropped = drop_unresolved(&mut table);
        assert_eq!(dropped, 2);
        assert!(table.len() <= enriched_len);
        assert_eq!(table.listings[0].listing_title.as_deref(), Some("Beach House"));
    }

    #[tokio::test]
    async fn test_titles_match_rows_by_position_not_completion_order() {
        let server = MockServer::start().await;
        // The first listing responds slowest; its title must still land on
        // the first row.
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_with_title("Slow Cabin"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_with_title("Fast Flat")))
            .mount(&server)
            .await;

        let mut table = ListingTable::new(vec![
            listing(&format!("{}/slow", server.uri())),
            listing(&format!("{}/fast", server.uri())),
        ]);
        fetcher().enrich_titles(&mut table).await;

        assert_eq!(table.listings[0].listing_title.as_deref(), Some("Slow Cabin"));
        assert_eq!(table.listings[1].listing_title.as_deref(), Some("Fast Flat"));
    }

    #[tokio::test]
    async fn test_timeout_resolves_to_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stall"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_with_title("Never Seen"))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let fetcher = TitleFetcher::new(Client::new(), Duration::from_millis(100), 4);
        let mut table = ListingTable::new(vec![listing(&format!("{}/stall", server.uri()))]);
        fetcher.enrich_titles(&mut table).await;

        assert_eq!(table.listings[0].listing_title.as_deref(), Some(NOT_AVAILABLE));
    }

    #[tokio::test]
    async fn test_already_resolved_titles_are_not_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_with_title("Fresh Title")))
            .expect(0)
            .mount(&server)
            .await;

        let mut resolved = listing(&format!("{}/a", server.uri()));
        resolved.listing_title = Some("Existing Title".to_string());
        let mut table = ListingTable::new(vec![resolved]);
        fetcher().enrich_titles(&mut table).await;

        assert_eq!(
            table.listings[0].listing_title.as_deref(),
            Some("Existing Title")
        );
    }
}
