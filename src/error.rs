use thiserror::Error;

/// Failure modes of a single scrape attempt. Only `Forbidden` and
/// `VisitorsNotFound` are worth another attempt; transport failures and
/// unexpected statuses are returned as-is.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The analytics page answered 403 before any HTML was read.
    #[error("analytics page returned 403 Forbidden")]
    Forbidden,

    /// The visitor-count selector matched nothing in the page.
    #[error("visitor count not present in page")]
    VisitorsNotFound,

    /// Transport failure or a non-200, non-403 status.
    #[error("request failed: {0}")]
    Http(String),
}

impl ScrapeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::Forbidden | ScrapeError::VisitorsNotFound)
    }

    /// Text sent back to the chat when scraping fails.
    pub fn user_reply(&self) -> &'static str {
        match self {
            ScrapeError::Forbidden => "403 Forbidden: Access is denied.",
            ScrapeError::VisitorsNotFound => "Could not find number of visitors.",
            ScrapeError::Http(_) => "An error occurred while processing your request.",
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Http(err.to_string())
    }
}
