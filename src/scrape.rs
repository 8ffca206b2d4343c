use std::future::Future;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;
use crate::report::{Competitor, Report};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:130.0) Gecko/20100101 Firefox/130.0";
const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Fetches the analytics competitors page for a domain and extracts the
/// traffic report from it.
pub struct Scraper {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl Scraper {
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// One GET against the competitors page, parsed into a report.
    /// A 403 answer short-circuits without reading the body.
    pub async fn fetch(&self, website: &str) -> Result<Report, ScrapeError> {
        let url = format!("{}/website/{}/competitors/", self.config.base_url, website);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout())
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept", ACCEPT)
            .header("Connection", "keep-alive")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::Forbidden);
        }
        if !status.is_success() {
            return Err(ScrapeError::Http(format!(
                "unexpected status {status} from {url}"
            )));
        }

        let body = response.text().await?;
        parse_report(website, &body)
    }

    /// Retry wrapper around [`Scraper::fetch`] using the configured attempt
    /// count and delay.
    pub async fn fetch_with_retry(&self, website: &str) -> Result<Report, ScrapeError> {
        with_retry(self.config.max_retries, self.config.retry_delay(), || {
            self.fetch(website)
        })
        .await
    }
}

/// Calls `op` up to `max_retries` times, sleeping `delay` between attempts.
/// Only retryable errors earn another attempt; the final outcome is returned
/// either way. A first-attempt success returns without sleeping.
pub async fn with_retry<T, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut last = op().await;
    for attempt in 1..max_retries {
        match &last {
            Ok(_) => break,
            Err(e) if !e.is_retryable() => break,
            Err(e) => warn!("Retry {}: {}, retrying...", attempt, e),
        }
        tokio::time::sleep(delay).await;
        last = op().await;
    }
    last
}

fn sel(css: &str) -> Selector {
    // Selectors are fixed strings; a parse failure is a programmer error.
    Selector::parse(css).expect("valid css selector")
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Pure selector-driven extraction, separate from the HTTP fetch so it runs
/// against captured fixture pages. The visitor count is required; everything
/// else degrades to `None` and renders as a placeholder line.
pub fn parse_report(website: &str, html: &str) -> Result<Report, ScrapeError> {
    let doc = Html::parse_document(html);

    let visitors = doc
        .select(&sel("p.engagement-list__item-value"))
        .next()
        .map(text_of)
        .ok_or(ScrapeError::VisitorsNotFound)?;

    let description = doc
        .select(&sel("div.wa-overview__description"))
        .next()
        .map(text_of);

    let competitors = doc
        .select(&sel("div.wa-competitors-card"))
        .map(|card| Competitor {
            title: card
                .select(&sel("a.wa-competitors-card__website-title"))
                .next()
                .map(text_of),
            description: card
                .select(&sel("p.wa-competitors-card__website-description"))
                .next()
                .map(text_of),
            traffic: card
                .select(&sel("p.engagement-list__item-value"))
                .next()
                .map(text_of),
        })
        .collect();

    Ok(Report {
        website: website.to_string(),
        visitors,
        description,
        competitors,
    })
}
