mod common;

use gamefinder_core::{Facet, Result, SearchError, StructuredQuery, Tag};
use gamefinder_engine::{
    AfterKey, BucketPage, FacetEnumerator, HitsPage, InMemoryEngine, SearchEngine,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Delegates to an in-memory engine but fails the n-th facet page.
struct FlakyFacets {
    inner: InMemoryEngine,
    fail_on: usize,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SearchEngine for FlakyFacets {
    async fn search(&self, query: &StructuredQuery) -> Result<HitsPage> {
        self.inner.search(query).await
    }

    async fn facet_page(
        &self,
        facet: Facet,
        after: Option<&AfterKey>,
        size: usize,
    ) -> Result<BucketPage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(SearchError::Upstream("status 503".into()));
        }
        self.inner.facet_page(facet, after, size).await
    }

    async fn query_string(&self, query: &str, offset: usize, limit: usize) -> Result<HitsPage> {
        self.inner.query_string(query, offset, limit).await
    }
}

/// Always answers with the same non-empty page and after key.
struct StuckFacets;

#[async_trait::async_trait]
impl SearchEngine for StuckFacets {
    async fn search(&self, _query: &StructuredQuery) -> Result<HitsPage> {
        Ok(HitsPage::default())
    }

    async fn facet_page(
        &self,
        _facet: Facet,
        _after: Option<&AfterKey>,
        _size: usize,
    ) -> Result<BucketPage> {
        Ok(BucketPage {
            buckets: vec![Tag::new(1, "Loop")],
            after_key: Some(AfterKey {
                id: 1,
                name: "Loop".into(),
            }),
        })
    }

    async fn query_string(&self, _query: &str, _offset: usize, _limit: usize) -> Result<HitsPage> {
        Ok(HitsPage::default())
    }
}

fn distinct(games: &[gamefinder_core::Game], facet: Facet) -> BTreeSet<Tag> {
    games.iter().flat_map(|g| facet.tags(g).iter().cloned()).collect()
}

#[tokio::test]
async fn enumerates_every_tag_once_across_pages() {
    let games = common::catalog(60);
    let engine = Arc::new(InMemoryEngine::new(games.clone()));
    let enumerator = FacetEnumerator::with_page_size(engine, 2);

    for facet in Facet::ALL {
        let tags = enumerator.enumerate(facet).await.unwrap();
        let as_set: BTreeSet<Tag> = tags.iter().cloned().collect();
        assert_eq!(as_set.len(), tags.len(), "duplicates in {}", facet);
        assert_eq!(as_set, distinct(&games, facet));
    }
}

#[tokio::test]
async fn enumeration_is_idempotent() {
    let engine = Arc::new(InMemoryEngine::new(common::catalog(45)));
    let enumerator = FacetEnumerator::with_page_size(engine, 3);
    let first = enumerator.catalog().await.unwrap();
    let second = enumerator.catalog().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.mechanics.len(), 5);
    assert_eq!(first.themes.len(), 3);
    let names: Vec<_> = first.themes.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Economic", "Fantasy", "Space"]);
}

#[tokio::test]
async fn mid_walk_failure_aborts_enumeration() {
    let engine = Arc::new(FlakyFacets {
        inner: InMemoryEngine::new(common::catalog(30)),
        fail_on: 2,
        calls: AtomicUsize::new(0),
    });
    let enumerator = FacetEnumerator::with_page_size(engine, 2);
    let err = enumerator.enumerate(Facet::Mechanics).await.unwrap_err();
    match err {
        SearchError::FacetEnumeration { facet, page, .. } => {
            assert_eq!(facet, Facet::Mechanics);
            assert_eq!(page, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn repeated_after_key_stops_the_walk() {
    let enumerator = FacetEnumerator::new(Arc::new(StuckFacets));
    let tags = enumerator.enumerate(Facet::Themes).await.unwrap();
    assert_eq!(tags, vec![Tag::new(1, "Loop")]);
}

#[tokio::test]
async fn empty_catalog_has_empty_vocabulary() {
    let enumerator = FacetEnumerator::new(Arc::new(InMemoryEngine::default()));
    let catalog = enumerator.catalog().await.unwrap();
    assert!(catalog.mechanics.is_empty());
    assert!(catalog.themes.is_empty());
}
