use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::scraper::PageSource;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// reqwest-backed [`PageSource`]. One attempt per URL; no retries or delays.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> ScrapeResult<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        Ok(Self::with_client(inner))
    }

    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Fetch a URL as text; any non-2xx status is an error.
    pub async fn get_text(&self, url: &str) -> ScrapeResult<String> {
        debug!("GET {}", url);

        let resp = self.inner.get(url).send().await.map_err(|e| classify(url, e))?;

        let status = resp.status();
        debug!("{} → {}", url, status);
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &str, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Timeout {
            url: url.to_string(),
        }
    } else {
        ScrapeError::Request(e)
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch(&self, url: &str) -> ScrapeResult<String> {
        self.get_text(url).await
    }
}
