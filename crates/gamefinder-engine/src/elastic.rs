//! Elasticsearch backend over its REST API.

use crate::traits::{AfterKey, BucketPage, Hit, HitsPage, SearchEngine};
use gamefinder_core::cursor::SortValue;
use gamefinder_core::{Facet, Game, Result, SearchError, StructuredQuery, Tag, Total};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

pub const DEFAULT_GAME_INDEX: &str = "boardgames";

pub struct ElasticEngine {
    client: reqwest::Client,
    endpoint: String,
    index: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
    #[serde(default)]
    aggregations: Option<JsonValue>,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Total,
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_source")]
    source: Game,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(default)]
    sort: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct CompositeAgg {
    buckets: Vec<CompositeBucket>,
    #[serde(default)]
    after_key: Option<AfterKey>,
}

#[derive(Deserialize)]
struct CompositeBucket {
    key: AfterKey,
}

impl ElasticEngine {
    pub fn new(endpoint: &str, index: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index: index.to_string(),
        })
    }

    async fn post_search(&self, body: &JsonValue) -> Result<SearchResponse> {
        let url = format!("{}/{}/_search", self.endpoint, self.index);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            tracing::warn!(%status, body = %snippet, "search engine rejected request");
            return Err(SearchError::Upstream(format!("status {}: {}", status, snippet)));
        }
        resp.json::<SearchResponse>()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Upstream(e.to_string())
    }
}

fn into_page(resp: SearchResponse) -> HitsPage {
    let hits = resp
        .hits
        .hits
        .into_iter()
        .map(|h| Hit {
            game: h.source,
            score: h.score.unwrap_or_default(),
            sort: h.sort.iter().map(SortValue::from_json).collect(),
        })
        .collect();
    HitsPage {
        hits,
        total: resp.hits.total,
    }
}

/// Composite aggregation over a facet's nested `(id, name)` pairs.
fn facet_body(facet: Facet, after: Option<&AfterKey>, size: usize) -> JsonValue {
    let path = facet.path();
    let mut composite = json!({
        "size": size,
        "sources": [
            {"id": {"terms": {"field": format!("{}.id", path)}}},
            {"name": {"terms": {"field": format!("{}.name.keyword", path)}}},
        ],
    });
    if let Some(after) = after {
        composite["after"] = json!(after);
    }
    json!({
        "size": 0,
        "aggs": {"facet": {
            "nested": {"path": path},
            "aggs": {"tags": {"composite": composite}},
        }},
    })
}

#[async_trait::async_trait]
impl SearchEngine for ElasticEngine {
    async fn search(&self, query: &StructuredQuery) -> Result<HitsPage> {
        let resp = self.post_search(&query.to_elastic()).await?;
        Ok(into_page(resp))
    }

    async fn facet_page(
        &self,
        facet: Facet,
        after: Option<&AfterKey>,
        size: usize,
    ) -> Result<BucketPage> {
        let resp = self.post_search(&facet_body(facet, after, size)).await?;
        let agg = resp
            .aggregations
            .as_ref()
            .and_then(|a| a.pointer("/facet/tags"))
            .cloned()
            .ok_or_else(|| SearchError::InvalidResponse("missing facet aggregation".into()))?;
        let agg: CompositeAgg =
            serde_json::from_value(agg).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
        Ok(BucketPage {
            buckets: agg
                .buckets
                .into_iter()
                .map(|b| Tag::new(b.key.id, b.key.name))
                .collect(),
            after_key: agg.after_key,
        })
    }

    async fn query_string(&self, query: &str, offset: usize, limit: usize) -> Result<HitsPage> {
        let body = json!({
            "from": offset,
            "size": limit,
            "query": {"query_string": {"query": query, "default_field": "name"}},
        });
        let resp = self.post_search(&body).await?;
        Ok(into_page(resp))
    }
}
