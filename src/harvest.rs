use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::discovery::{discover_titles, DiscoveryOptions};
use crate::fetch::{fetch_with_retry, CircuitBreaker, Fetch, RetryPolicy};
use crate::model::{CompanyCredit, ContentDetail, Review, Title};
use crate::pagination::generate_page_urls;
use crate::parser::{parse_company_credits, parse_detail, parse_reviews};
use crate::settings::{Seed, Settings};
use crate::sink::CsvSink;

pub const CREDITS_SUFFIX: &str = "companycredits";
pub const REVIEWS_SUFFIX: &str = "reviews/?sort=submissionDate&dir=desc&rating";

/// Counts for one seed's run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub seed: String,
    pub titles: usize,
    pub details: usize,
    pub credits: usize,
    pub producer_rows: usize,
    pub distributor_rows: usize,
    pub open_ended: usize,
    pub reviews: usize,
    pub diagnostics: BTreeMap<DiagnosticKind, usize>,
}

impl RunReport {
    pub fn print(&self) {
        println!(
            "[{}] {} titles: {} details, {} credits ({} producer rows, {} distributor rows, {} still active), {} reviews.",
            self.seed,
            self.titles,
            self.details,
            self.credits,
            self.producer_rows,
            self.distributor_rows,
            self.open_ended,
            self.reviews,
        );
        if !self.diagnostics.is_empty() {
            let parts: Vec<String> = self
                .diagnostics
                .iter()
                .map(|(k, n)| format!("{} {}", n, k))
                .collect();
            println!("[{}] diagnostics: {}", self.seed, parts.join(", "));
        }
    }
}

/// Runs the pipeline stages for one seed at a time. Fetches are strictly
/// sequential; parsing a batch of fetched pages is data-parallel.
pub struct Harvester<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    settings: &'a Settings,
}

impl<'a, F: Fetch + ?Sized> Harvester<'a, F> {
    pub fn new(fetcher: &'a F, settings: &'a Settings) -> Self {
        Self { fetcher, settings }
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::from_settings(self.settings)
    }

    pub async fn discover(
        &self,
        seed: &Seed,
        num_pages: usize,
        diags: &mut Diagnostics,
    ) -> Vec<Title> {
        let page_urls = generate_page_urls(&seed.url, num_pages);
        info!("[{}] discovering titles over {} pages", seed.name, page_urls.len());
        let opts = DiscoveryOptions {
            site_root: &self.settings.site_root,
            retry: self.retry(),
            page_delay: Duration::from_millis(self.settings.page_delay_ms),
        };
        discover_titles(self.fetcher, &page_urls, &opts, diags).await
    }

    /// Fetch `<title url><suffix>` for each title. Failures and titles skipped
    /// by an open breaker are diagnosed and left out. Each call is one stage
    /// with its own breaker.
    async fn fetch_pages(
        &self,
        titles: &[Title],
        suffix: &str,
        diags: &mut Diagnostics,
    ) -> Vec<(Title, String)> {
        let delay = Duration::from_millis(self.settings.title_delay_ms);
        let retry = self.retry();
        let mut breaker = CircuitBreaker::new(self.settings.breaker_threshold);
        let pb = progress_bar(titles.len());
        let mut pages = Vec::with_capacity(titles.len());

        for title in titles {
            pb.inc(1);
            if breaker.is_open() {
                diags.record(
                    &title.id,
                    DiagnosticKind::CircuitOpen,
                    "skipped: too many consecutive fetch failures",
                );
                continue;
            }

            let url = format!("{}{}", title.url, suffix);
            match fetch_with_retry(self.fetcher, &url, retry).await {
                Ok(html) => {
                    breaker.record_success();
                    pages.push((title.clone(), html));
                }
                Err(e) => {
                    breaker.record_failure(&e);
                    diags.record(&title.id, DiagnosticKind::FetchFailed, format!("{}: {}", url, e));
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        pb.finish_and_clear();
        pages
    }

    pub async fn details(
        &self,
        titles: &[Title],
        diags: &mut Diagnostics,
    ) -> Result<Vec<ContentDetail>> {
        let pages = self.fetch_pages(titles, "", diags).await;
        parse_off_runtime(pages, diags, |(title, html), d| parse_detail(title, html, d)).await
    }

    pub async fn credits(
        &self,
        titles: &[Title],
        as_of_year: i32,
        diags: &mut Diagnostics,
    ) -> Result<Vec<CompanyCredit>> {
        let pages = self.fetch_pages(titles, CREDITS_SUFFIX, diags).await;
        parse_off_runtime(pages, diags, move |(title, html), d| {
            parse_company_credits(&title.id, html, as_of_year, d)
        })
        .await
    }

    pub async fn reviews(&self, titles: &[Title], diags: &mut Diagnostics) -> Result<Vec<Review>> {
        let pages = self.fetch_pages(titles, REVIEWS_SUFFIX, diags).await;
        tokio::task::spawn_blocking(move || {
            pages
                .par_iter()
                .flat_map_iter(|(title, html)| parse_reviews(&title.id, html))
                .collect::<Vec<_>>()
        })
        .await
        .context("review parse task failed")
    }

    /// Discover, enrich and write one seed.
    pub async fn run_seed(
        &self,
        seed: &Seed,
        num_pages: usize,
        limit: Option<usize>,
        as_of_year: i32,
        sink: &CsvSink,
    ) -> Result<RunReport> {
        let mut diags = Diagnostics::new();
        let mut titles = self.discover(seed, num_pages, &mut diags).await;
        if let Some(n) = limit {
            titles.truncate(n);
        }

        let details = self.details(&titles, &mut diags).await?;
        let credits = self.credits(&titles, as_of_year, &mut diags).await?;

        let report = RunReport {
            seed: seed.name.clone(),
            titles: titles.len(),
            details: sink.write_content(&details)?,
            credits: credits.len(),
            producer_rows: sink.write_producers(&credits, self.settings.producer_layout)?,
            distributor_rows: sink.write_distributors(&credits)?,
            open_ended: credits
                .iter()
                .flat_map(|c| &c.distributors)
                .filter(|d| d.open_ended)
                .count(),
            reviews: 0,
            diagnostics: diags.histogram(),
        };
        info!("[{}] wrote output to {}", seed.name, sink.dir().display());
        Ok(report)
    }

    /// Supplementary review harvest (first review page per title only).
    pub async fn run_reviews(
        &self,
        seed: &Seed,
        num_pages: usize,
        limit: Option<usize>,
        sink: &CsvSink,
    ) -> Result<RunReport> {
        let mut diags = Diagnostics::new();
        let mut titles = self.discover(seed, num_pages, &mut diags).await;
        if let Some(n) = limit {
            titles.truncate(n);
        }

        let reviews = self.reviews(&titles, &mut diags).await?;

        Ok(RunReport {
            seed: seed.name.clone(),
            titles: titles.len(),
            reviews: sink.write_reviews(&reviews)?,
            diagnostics: diags.histogram(),
            ..Default::default()
        })
    }
}

/// Runs `parse_batch` on the blocking pool so rayon never occupies a runtime
/// worker.
async fn parse_off_runtime<T, P>(
    pages: Vec<(Title, String)>,
    diags: &mut Diagnostics,
    parse: P,
) -> Result<Vec<T>>
where
    T: Send + 'static,
    P: Fn(&(Title, String), &mut Diagnostics) -> T + Send + Sync + 'static,
{
    let (out, batch_diags) = tokio::task::spawn_blocking(move || {
        let mut d = Diagnostics::new();
        let out = parse_batch(&pages, &mut d, parse);
        (out, d)
    })
    .await
    .context("parse task failed")?;
    diags.extend(batch_diags);
    Ok(out)
}

/// Parse fetched pages in parallel; each page gets its own diagnostics,
/// merged back in page order.
fn parse_batch<T, P>(pages: &[(Title, String)], diags: &mut Diagnostics, parse: P) -> Vec<T>
where
    T: Send,
    P: Fn(&(Title, String), &mut Diagnostics) -> T + Sync,
{
    let results: Vec<(T, Diagnostics)> = pages
        .par_iter()
        .map(|page| {
            let mut d = Diagnostics::new();
            let out = parse(page, &mut d);
            (out, d)
        })
        .collect();

    results
        .into_iter()
        .map(|(out, d)| {
            diags.extend(d);
            out
        })
        .collect()
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
