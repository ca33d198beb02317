use crate::metrics::{
    ENGINE_ERRORS_TOTAL, SEARCH_REQUESTS_TOTAL, SEARCH_REQUEST_SECONDS, TAG_CACHE_TOTAL,
};
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gamefinder_core::{codec, SearchError, TagCatalog};
use gamefinder_engine::{FacetEnumerator, SearchEngine, SearchGateway};
use parking_lot::RwLock;
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

const TAGS_CACHE_CONTROL: &str = "public, max-age=86400";

#[derive(Clone)]
pub struct AppState {
    gateway: SearchGateway,
    facets: FacetEnumerator,
    tags: Arc<TagCache>,
}

impl AppState {
    pub fn new(engine: Arc<dyn SearchEngine>, tag_ttl: Duration) -> Self {
        Self {
            gateway: SearchGateway::new(engine.clone()),
            facets: FacetEnumerator::new(engine),
            tags: Arc::new(TagCache::new(tag_ttl)),
        }
    }
}

/// Last successful tag catalog; failures are never stored.
pub struct TagCache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, Arc<TagCatalog>)>>,
}

impl TagCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    fn fresh(&self) -> Option<Arc<TagCatalog>> {
        let entry = self.entry.read();
        match &*entry {
            Some((at, catalog)) if at.elapsed() < self.ttl => Some(catalog.clone()),
            _ => None,
        }
    }

    fn store(&self, catalog: TagCatalog) -> Arc<TagCatalog> {
        let catalog = Arc::new(catalog);
        *self.entry.write() = Some((Instant::now(), catalog.clone()));
        catalog
    }
}

struct ApiError(SearchError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SearchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            SearchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SearchError::Upstream(_)
            | SearchError::InvalidResponse(_)
            | SearchError::FacetEnumeration { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

fn record(route: &str, result: &Result<impl Sized, SearchError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => {
            ENGINE_ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
            tracing::warn!(route, kind = e.kind(), error = %e, "request failed");
            e.kind()
        }
    };
    SEARCH_REQUESTS_TOTAL
        .with_label_values(&[route, outcome])
        .inc();
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/api/tags", get(tags))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn search(State(app): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    let _timer = SEARCH_REQUEST_SECONDS
        .with_label_values(&["search"])
        .start_timer();
    let (filters, cursor) = codec::decode_request(raw.as_deref().unwrap_or_default());
    let canonical = codec::encode_request(&filters, &cursor);
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("search", %request_id, query = %canonical);

    let result = app.gateway.search(&filters, &cursor).instrument(span).await;
    record("search", &result);
    match result {
        Ok(page) => {
            let mut headers = HeaderMap::new();
            let etag = format!("W/\"{}\"", blake3::hash(canonical.as_bytes()).to_hex());
            if let Ok(v) = HeaderValue::from_str(&etag) {
                headers.insert(header::ETAG, v);
            }
            if let Ok(v) = HeaderValue::from_str(&request_id.to_string()) {
                headers.insert("x-request-id", v);
            }
            (StatusCode::OK, headers, Json(page)).into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn tags(State(app): State<AppState>) -> Response {
    let _timer = SEARCH_REQUEST_SECONDS
        .with_label_values(&["tags"])
        .start_timer();
    let catalog = match app.tags.fresh() {
        Some(catalog) => {
            TAG_CACHE_TOTAL.with_label_values(&["hit"]).inc();
            Ok(catalog)
        }
        None => {
            TAG_CACHE_TOTAL.with_label_values(&["miss"]).inc();
            let started = Instant::now();
            let result = app.facets.catalog().await.map(|c| app.tags.store(c));
            if let Ok(c) = &result {
                tracing::info!(
                    mechanics = c.mechanics.len(),
                    themes = c.themes.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tag catalog refreshed"
                );
            }
            result
        }
    };
    record("tags", &catalog);
    match catalog {
        Ok(catalog) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, TAGS_CACHE_CONTROL)],
            Json(catalog.as_ref().clone()),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buf);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        String::from_utf8(buf).unwrap_or_default(),
    )
}
