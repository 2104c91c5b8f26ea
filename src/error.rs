use thiserror::Error;

/// Everything that can go wrong between a page-count request and a JSON body.
///
/// Fetch and parse variants are per-task: the crawler logs and drops them.
/// Only the input errors, `InvalidBaseUrl` and `Encode` ever reach a caller.
#[derive(Debug, Error)]
pub enum ScrapeError {
    // ── Input ────────────────────────────────────────────────────────────────
    #[error("invalid page count {input:?}: expected a non-negative integer")]
    InvalidPageCount { input: String },

    #[error("page count {requested} exceeds the limit of {max}")]
    TooManyPages { requested: u32, max: u32 },

    // ── Fetch ────────────────────────────────────────────────────────────────
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("fetch timed out: {url}")]
    Timeout { url: String },

    // ── Parse ────────────────────────────────────────────────────────────────
    #[error("bad selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("unparseable date {input:?}")]
    Date { input: String },

    // ── Crawl / boundary ─────────────────────────────────────────────────────
    #[error("invalid base url {input:?}: {source}")]
    InvalidBaseUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ScrapeError {
    /// True for errors caused by the caller's input rather than the crawl.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScrapeError::InvalidPageCount { .. } | ScrapeError::TooManyPages { .. }
        )
    }
}

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
