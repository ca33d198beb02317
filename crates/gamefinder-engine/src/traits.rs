use gamefinder_core::cursor::SortValue;
use gamefinder_core::{Facet, Game, Result, StructuredQuery, Tag, TagId, Total};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub game: Game,
    pub score: f64,
    /// Values of the active sort fields for this document, in sort order.
    pub sort: Vec<SortValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HitsPage {
    pub hits: Vec<Hit>,
    pub total: Total,
}

/// Composite aggregation position: the last `(id, name)` bucket seen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AfterKey {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketPage {
    pub buckets: Vec<Tag>,
    pub after_key: Option<AfterKey>,
}

/// The document search engine, used as a service.
#[async_trait::async_trait]
pub trait SearchEngine: Send + Sync + 'static {
    /// Runs one page of a compiled query.
    async fn search(&self, query: &StructuredQuery) -> Result<HitsPage>;

    /// Up to `size` distinct `(id, name)` pairs of `facet` strictly after
    /// `after` in composite key order.
    async fn facet_page(
        &self,
        facet: Facet,
        after: Option<&AfterKey>,
        size: usize,
    ) -> Result<BucketPage>;

    /// Free-form query-string search on game names, offset paginated.
    async fn query_string(&self, query: &str, offset: usize, limit: usize) -> Result<HitsPage>;
}
