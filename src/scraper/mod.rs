pub mod dates;
pub mod discovery;
pub mod extract;
pub mod filter;
pub mod http_client;

use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use scraper::Selector;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Fetch-by-URL primitive the crawler is built on.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Raw document text for `url`. Non-success statuses are errors.
    async fn fetch(&self, url: &str) -> ScrapeResult<String>;
}

// ── Selectors ─────────────────────────────────────────────────────────────────

pub fn selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

// ── Test fixtures ─────────────────────────────────────────────────────────────
