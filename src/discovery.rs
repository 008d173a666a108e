use std::collections::HashSet;
use std::time::Duration;

use tracing::info;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::fetch::{fetch_with_retry, Fetch, RetryPolicy};
use crate::model::Title;
use crate::parser::parse_listing;

/// First-seen-wins accumulator of titles across listing pages.
#[derive(Debug, Default)]
pub struct TitleIndex {
    seen: HashSet<String>,
    titles: Vec<Title>,
}

impl TitleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and drops the title) when its id was already seen.
    pub fn insert(&mut self, title: Title) -> bool {
        if !self.seen.insert(title.id.clone()) {
            return false;
        }
        self.titles.push(title);
        true
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn into_titles(self) -> Vec<Title> {
        self.titles
    }
}

pub struct DiscoveryOptions<'a> {
    pub site_root: &'a str,
    pub retry: RetryPolicy,
    /// Pause after every listing page fetch.
    pub page_delay: Duration,
}

/// Fetch each listing page in order and collect the deduplicated titles.
/// Pages that cannot be fetched are diagnosed and skipped.
pub async fn discover_titles<F: Fetch + ?Sized>(
    fetcher: &F,
    page_urls: &[String],
    opts: &DiscoveryOptions<'_>,
    diags: &mut Diagnostics,
) -> Vec<Title> {
    let mut index = TitleIndex::new();

    for (i, page_url) in page_urls.iter().enumerate() {
        match fetch_with_retry(fetcher, page_url, opts.retry).await {
            Ok(html) => {
                let before = index.len();
                for title in parse_listing(&html, page_url, opts.site_root, diags) {
                    index.insert(title);
                }
                info!(
                    "Page {}/{}: {} new titles ({} total)",
                    i + 1,
                    page_urls.len(),
                    index.len() - before,
                    index.len()
                );
            }
            Err(e) => diags.record(
                page_url,
                DiagnosticKind::FetchFailed,
                format!("listing page fetch failed: {}", e),
            ),
        }

        if !opts.page_delay.is_zero() {
            tokio::time::sleep(opts.page_delay).await;
        }
    }

    index.into_titles()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeFetcher;
    use crate::fetch::FetchError;

    fn opts() -> DiscoveryOptions<'static> {
        DiscoveryOptions {
            site_root: "https://www.imdb.com",
            retry: RetryPolicy {
                max_retries: 1,
                base_backoff: Duration::ZERO,
            },
            page_delay: Duration::ZERO,
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn index_keeps_first_occurrence() {
        let mut index = TitleIndex::new();
        let t = |title: &str| Title {
            id: "tt1".into(),
            title: title.into(),
            url: "u".into(),
        };
        assert!(index.insert(t("first")));
        assert!(!index.insert(t("second")));
        let titles = index.into_titles();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles[0].title, "first");
    }

    #[tokio::test]
    async fn dedups_across_pages() {
        let pages = vec!["p1".to_string(), "p2".to_string()];
        let fetcher = FakeFetcher::new()
            .with_page("p1", fixture("listing_page1"))
            .with_page("p2", fixture("listing_page2"));
        let mut diags = Diagnostics::new();

        let titles = discover_titles(&fetcher, &pages, &opts(), &mut diags).await;

        let ids: Vec<&str> = titles.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tt4574334", "tt5180504", "tt7078180", "tt2085059"]);
        // first occurrence wins
        assert_eq!(titles[1].title, "The Witcher");
        // duplicates are not diagnostics
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn failed_page_is_skipped() {
        let pages = vec!["p1".to_string(), "p2".to_string()];
        let fetcher = FakeFetcher::new()
            .with_page("p2", fixture("listing_page2"))
            .with_failures("p1", vec![FetchError::Status(503), FetchError::Status(503)]);
        let mut diags = Diagnostics::new();

        let titles = discover_titles(&fetcher, &pages, &opts(), &mut diags).await;

        assert_eq!(titles.len(), 2);
        assert_eq!(diags.count(DiagnosticKind::FetchFailed), 1);
    }
}
