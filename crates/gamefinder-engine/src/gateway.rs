use crate::traits::SearchEngine;
use gamefinder_core::{compile, cursor, FilterSet, Result, SearchPage, PAGE_SIZE};
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, HistogramVec};
use std::sync::Arc;

static ENGINE_SEARCH_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "engine_search_seconds",
        "Search engine round trip by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Compiles filter state into engine queries and turns engine hits into
/// client pages with a resumable cursor.
#[derive(Clone)]
pub struct SearchGateway {
    engine: Arc<dyn SearchEngine>,
    page_size: usize,
}

impl SearchGateway {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            page_size: PAGE_SIZE,
        }
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    /// One page of results for `filters`, resuming after `cursor` when it
    /// decodes against the active sort.
    pub async fn search(&self, filters: &FilterSet, cursor: &[String]) -> Result<SearchPage> {
        let query = compile(filters, cursor, self.page_size);
        if !cursor.is_empty() && query.search_after.is_none() {
            tracing::debug!(?cursor, "cursor does not fit sort; starting over");
        }
        let timer = std::time::Instant::now();
        let result = self.engine.search(&query).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        ENGINE_SEARCH_SECONDS
            .with_label_values(&[outcome])
            .observe(timer.elapsed().as_secs_f64());
        let page = result?;
        let next_cursor = page.hits.last().map(|h| cursor::encode(&h.sort));
        tracing::debug!(
            hits = page.hits.len(),
            total = page.total.value,
            resumed = query.search_after.is_some(),
            "search page"
        );
        Ok(SearchPage {
            hits: page.hits.into_iter().map(|h| h.game).collect(),
            total: page.total,
            next_cursor,
        })
    }
}
