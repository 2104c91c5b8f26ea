//! Crawl orchestrator: index pages → detail pages → accepted listings.
//!
//! ## Task tree
//!
//! `run(n)` spawns one task per index page `1..=n` into a top-level
//! `JoinSet`. Each index task discovers its detail links and spawns one task
//! per link into its *own* `JoinSet`, which it drains before returning. So
//! when the top-level set is empty every detail task has finished too, even
//! though none of them existed when the crawl started.
//!
//! Per-page failures (network, status, markup) are logged and counted, never
//! returned. The only errors `run` reports are about its inputs.

use crate::config::ScraperConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::Listing;
use crate::scraper::discovery::discover_links;
use crate::scraper::extract::{DetailSelectors, extract_bundles};
use crate::scraper::filter::into_listing;
use crate::scraper::http_client::HttpClient;
use crate::scraper::{PageSource, selector};
use crate::utils::Timer;
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};
use url::Url;

// ── Input validation ──────────────────────────────────────────────────────────

/// Parse a caller-supplied page count. Missing, non-numeric and negative
/// values are input errors.
pub fn parse_page_count(input: Option<&str>) -> ScrapeResult<u32> {
    let raw = input.unwrap_or_default();
    raw.parse::<u32>().map_err(|_| ScrapeError::InvalidPageCount {
        input: raw.to_string(),
    })
}

// ── Result collection ─────────────────────────────────────────────────────────

/// Append-only listing sink shared by the detail tasks of one crawl.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    inner: Arc<Mutex<Vec<Listing>>>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends all of `listings` under one lock, so they land contiguously.
    pub async fn extend(&self, listings: Vec<Listing>) {
        if listings.is_empty() {
            return;
        }
        self.inner.lock().await.extend(listings);
    }

    /// Move everything out, leaving the collection empty.
    pub async fn take(&self) -> Vec<Listing> {
        std::mem::take(&mut *self.inner.lock().await)
    }
}

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counters {
    index_fetched: AtomicUsize,
    index_failed: AtomicUsize,
    detail_fetched: AtomicUsize,
    detail_failed: AtomicUsize,
    accepted: AtomicUsize,
    rejected: AtomicUsize,
    panicked: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    fn snapshot(&self, elapsed: Duration) -> CrawlStats {
        CrawlStats {
            index_pages_fetched: self.index_fetched.load(Ordering::Relaxed),
            index_pages_failed: self.index_failed.load(Ordering::Relaxed),
            detail_pages_fetched: self.detail_fetched.load(Ordering::Relaxed),
            detail_pages_failed: self.detail_failed.load(Ordering::Relaxed),
            listings_accepted: self.accepted.load(Ordering::Relaxed),
            listings_rejected: self.rejected.load(Ordering::Relaxed),
            tasks_panicked: self.panicked.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStats {
    pub index_pages_fetched: usize,
    pub index_pages_failed: usize,
    pub detail_pages_fetched: usize,
    pub detail_pages_failed: usize,
    pub listings_accepted: usize,
    pub listings_rejected: usize,
    pub tasks_panicked: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub listings: Vec<Listing>,
    pub stats: CrawlStats,
    /// The overall deadline fired; `listings` holds what finished in time.
    pub timed_out: bool,
}

// ── Phases ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    FetchingIndexPages,
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::FetchingIndexPages => "fetching index pages",
            Phase::Draining => "draining",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

fn advance(phase: &mut Phase, next: Phase) {
    debug!("crawl: {} → {}", phase, next);
    *phase = next;
}

// ── Crawler ───────────────────────────────────────────────────────────────────

/// Everything the tasks of one `run` share.
struct CrawlContext {
    source: Arc<dyn PageSource>,
    detail: DetailSelectors,
    read_more: Selector,
    results: ResultCollection,
    counters: Counters,
    now: DateTime<Utc>,
}

pub struct Crawler {
    source: Arc<dyn PageSource>,
    base_url: String,
    deadline: Option<Duration>,
    max_pages: Option<u32>,
}

impl Crawler {
    /// `crawl_deadline_secs == 0` disables the overall deadline and
    /// `max_pages == 0` the page cap.
    pub fn new(source: Arc<dyn PageSource>, config: &ScraperConfig) -> Self {
        let deadline = match config.crawl_deadline_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            source,
            base_url: config.base_url.clone(),
            deadline,
            max_pages: (config.max_pages > 0).then_some(config.max_pages),
        }
    }

    /// Crawler over the live site.
    pub fn from_config(config: &ScraperConfig) -> ScrapeResult<Self> {
        let client = HttpClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn index_url(&self, page: u32) -> String {
        format!("{}{}", self.base_url, page)
    }

    /// Crawl index pages `1..=page_count` and every listing they link to.
    pub async fn run(&self, page_count: u32) -> ScrapeResult<CrawlOutcome> {
        if let Some(max) = self.max_pages.filter(|max| page_count > *max) {
            return Err(ScrapeError::TooManyPages {
                requested: page_count,
                max,
            });
        }
        Url::parse(&self.base_url).map_err(|source| ScrapeError::InvalidBaseUrl {
            input: self.base_url.clone(),
            source,
        })?;

        let timer = Timer::start(format!("crawl of {} index pages", page_count));
        let mut phase = Phase::Idle;

        let ctx = Arc::new(CrawlContext {
            source: Arc::clone(&self.source),
            detail: DetailSelectors::new()?,
            read_more: selector("a.read-more")?,
            results: ResultCollection::new(),
            counters: Counters::default(),
            now: Utc::now(),
        });

        advance(&mut phase, Phase::FetchingIndexPages);
        let mut index_tasks = JoinSet::new();
        for page in 1..=page_count {
            let url = self.index_url(page);
            index_tasks.spawn(crawl_index_page(Arc::clone(&ctx), page, url));
        }

        advance(&mut phase, Phase::Draining);
        let join_all = drain(&mut index_tasks, &ctx.counters, "index page");
        let timed_out = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, join_all).await.is_err(),
            None => {
                join_all.await;
                false
            }
        };

        if timed_out {
            warn!(
                "Crawl deadline hit; abandoning {} unfinished index pages",
                index_tasks.len()
            );
            // Dropping an index task drops its JoinSet, which aborts its detail tasks.
            index_tasks.abort_all();
            while index_tasks.join_next().await.is_some() {}
        }

        let listings = ctx.results.take().await;
        let stats = ctx.counters.snapshot(timer.elapsed());
        advance(&mut phase, Phase::Done);

        info!(
            "Crawl done: {} listings | index {} ok / {} failed | detail {} ok / {} failed | {} rejected",
            listings.len(),
            stats.index_pages_fetched,
            stats.index_pages_failed,
            stats.detail_pages_fetched,
            stats.detail_pages_failed,
            stats.listings_rejected,
        );

        Ok(CrawlOutcome {
            listings,
            stats,
            timed_out,
        })
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn drain(tasks: &mut JoinSet<()>, counters: &Counters, kind: &str) {
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            report_join_error(e, counters, kind);
        }
    }
}

fn report_join_error(e: JoinError, counters: &Counters, kind: &str) {
    if e.is_panic() {
        error!("{} task panicked: {}", kind, e);
        Counters::bump(&counters.panicked);
    }
}

async fn crawl_index_page(ctx: Arc<CrawlContext>, page: u32, url: String) {
    debug!("Scraping index page {} ({})", page, url);

    let html = match ctx.source.fetch(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Index page {}: {}", page, e);
            Counters::bump(&ctx.counters.index_failed);
            return;
        }
    };

    let page_url = match Url::parse(&url) {
        Ok(u) => u,
        Err(e) => {
            warn!("Index page {}: bad url {:?}: {}", page, url, e);
            Counters::bump(&ctx.counters.index_failed);
            return;
        }
    };
    Counters::bump(&ctx.counters.index_fetched);

    let links = detail_links(&html, &ctx.read_more, &page_url);
    debug!("Index page {}: {} detail links", page, links.len());

    let mut detail_tasks = JoinSet::new();
    for link in links {
        detail_tasks.spawn(crawl_detail_page(Arc::clone(&ctx), link));
    }
    drain(&mut detail_tasks, &ctx.counters, "detail page").await;
}

async fn crawl_detail_page(ctx: Arc<CrawlContext>, url: Url) {
    let html = match ctx.source.fetch(url.as_str()).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Detail page {}: {}", url, e);
            Counters::bump(&ctx.counters.detail_failed);
            return;
        }
    };
    Counters::bump(&ctx.counters.detail_fetched);

    let (accepted, rejected) = accepted_listings(&html, &ctx.detail, ctx.now);
    debug!("{}: {} accepted, {} rejected", url, accepted.len(), rejected);

    Counters::add(&ctx.counters.accepted, accepted.len());
    Counters::add(&ctx.counters.rejected, rejected);
    ctx.results.extend(accepted).await;
}

// `Html` isn't `Send`, so parsing stays in these sync helpers and never
// lives across an await.

fn detail_links(html: &str, read_more: &Selector, page_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    discover_links(&doc, read_more, page_url).collect()
}

fn accepted_listings(
    html: &str,
    sels: &DetailSelectors,
    now: DateTime<Utc>,
) -> (Vec<Listing>, usize) {
    let doc = Html::parse_document(html);
    let bundles = extract_bundles(&doc, sels, now);
    let total = bundles.len();
    let accepted: Vec<Listing> = bundles.into_iter().filter_map(into_listing).collect();
    let rejected = total - accepted.len();
    (accepted, rejected)
}
