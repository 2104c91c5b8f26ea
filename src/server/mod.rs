//! HTTP front end: `GET /scrape-data?numpages=N` → `{ "items": [...] }`.

use crate::error::ScrapeError;
use crate::models::ApiResponse;
use crate::pipeline::{Crawler, parse_page_count};
use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// "true" when the crawl deadline cut the result short.
pub const PARTIAL_HEADER: HeaderName = HeaderName::from_static("x-crawl-partial");

#[derive(Clone)]
pub struct AppState {
    crawler: Arc<Crawler>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    numpages: Option<String>,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Maps the caller-visible [`ScrapeError`]s onto status codes.
#[derive(Debug)]
pub struct ApiError(ScrapeError);

impl From<ScrapeError> for ApiError {
    fn from(err: ScrapeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = &self.0;
        let (status, message) = if err.is_input_error() {
            (
                StatusCode::BAD_REQUEST,
                format!("Error converting number of pages passed in: {}", err),
            )
        } else if matches!(err, ScrapeError::Encode(_)) {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        } else {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Scraping error: {}", err),
            )
        };

        if status.is_server_error() {
            error!("{}", message);
        } else {
            warn!("{}", message);
        }
        (status, message).into_response()
    }
}

// ── Routes ────────────────────────────────────────────────────────────────────

pub fn router(crawler: Arc<Crawler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let scrape_route = get(scrape).post(scrape).options(preflight);

    Router::new()
        .route("/scrape-data", scrape_route.clone())
        .route("/api/scrape", scrape_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { crawler })
}

async fn scrape(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Response, ApiError> {
    let pages = parse_page_count(params.numpages.as_deref())?;
    info!("Scrape request for {} pages", pages);

    let outcome = state.crawler.run(pages).await?;
    if outcome.timed_out {
        warn!(
            "Crawl of {} pages hit its deadline; returning {} listings gathered so far",
            pages,
            outcome.listings.len()
        );
    }

    let body = serde_json::to_vec(&ApiResponse {
        items: outcome.listings,
    })
    .map_err(ScrapeError::from)?;

    let partial = if outcome.timed_out { "true" } else { "false" };
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (PARTIAL_HEADER, HeaderValue::from_static(partial)),
        ],
        body,
    )
        .into_response())
}

/// Bare `OPTIONS` that isn't a CORS pre-flight still gets a 200.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

// ── Serve ─────────────────────────────────────────────────────────────────────

pub async fn serve(crawler: Arc<Crawler>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Could not bind {}", bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(crawler))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await
        .context("Server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::models::Listing;
    use crate::scraper::fixtures::{FixtureSource, detail_page, index_page};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const BASE: &str = "https://site.example/page/";

    fn app_with(source: FixtureSource, base_url: &str) -> Router {
        let cfg = ScraperConfig {
            base_url: base_url.to_string(),
            ..ScraperConfig::default()
        };
        router(Arc::new(Crawler::new(Arc::new(source), &cfg)))
    }

    fn app() -> Router {
        app_with(
            FixtureSource::new()
                .page(format!("{BASE}1"), index_page(&["/a/"]))
                .page(
                    "https://site.example/a/",
                    detail_page("A", "Worldwide", "June 6th, 2099", Some("https://enter.example/a")),
                ),
            BASE,
        )
    }

    async fn body_string(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn returns_items_json() {
        let resp = app()
            .oneshot(Request::get("/scrape-data?numpages=1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(resp.headers().get(PARTIAL_HEADER).unwrap(), "false");

        let parsed: ApiResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(
            parsed.items,
            vec![Listing {
                expiration_date: "June 6th, 2099".into(),
                name: "A".into(),
                url: "https://enter.example/a".into(),
                image_url: "https://img.example/A.jpg".into(),
            }]
        );
    }

    #[tokio::test]
    async fn api_route_behaves_the_same() {
        let resp = app()
            .oneshot(Request::get("/api/scrape?numpages=0").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, r#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn bad_page_count_is_400() {
        for uri in ["/scrape-data?numpages=abc", "/scrape-data", "/scrape-data?numpages=-2"] {
            let resp = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(body_string(resp).await.contains("number of pages"));
        }
    }

    #[tokio::test]
    async fn page_count_over_cap_is_400() {
        let resp = app()
            .oneshot(Request::get("/scrape-data?numpages=4000000000").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("exceeds the limit"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cut_is_flagged() {
        let source = FixtureSource::new()
            .page(format!("{BASE}1"), index_page(&["/a/", "/slow/"]))
            .page(
                "https://site.example/a/",
                detail_page("A", "Worldwide", "June 6th, 2099", None),
            )
            .page(
                "https://site.example/slow/",
                detail_page("Slow", "Worldwide", "June 6th, 2099", None),
            )
            .slow("https://site.example/slow/", std::time::Duration::from_secs(600));
        let cfg = ScraperConfig {
            base_url: BASE.to_string(),
            crawl_deadline_secs: 5,
            ..ScraperConfig::default()
        };
        let app = router(Arc::new(Crawler::new(Arc::new(source), &cfg)));

        let resp = app
            .oneshot(Request::get("/scrape-data?numpages=1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(PARTIAL_HEADER).unwrap(), "true");
        let parsed: ApiResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].name, "A");
    }

    #[tokio::test]
    async fn crawl_failure_is_500() {
        let resp = app_with(FixtureSource::new(), "::not a url::")
            .oneshot(Request::get("/scrape-data?numpages=1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(resp).await.starts_with("Scraping error"));
    }

    #[tokio::test]
    async fn cors_preflight_is_empty_200() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/scrape-data")
                    .header(header::ORIGIN, "https://frontend.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn bare_options_is_empty_200() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/scrape-data")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.is_empty());
    }
}
