//! Full tag vocabulary per facet via composite aggregation paging.

use crate::traits::{AfterKey, SearchEngine};
use gamefinder_core::{Facet, Result, SearchError, Tag, TagCatalog, TagId};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const FACET_PAGE_SIZE: usize = 100;

static FACET_PAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "facet_pages_total",
        "Composite aggregation pages fetched",
        &["facet"]
    )
    .unwrap()
});

#[derive(Clone)]
pub struct FacetEnumerator {
    engine: Arc<dyn SearchEngine>,
    page_size: usize,
}

impl FacetEnumerator {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self::with_page_size(engine, FACET_PAGE_SIZE)
    }

    pub fn with_page_size(engine: Arc<dyn SearchEngine>, page_size: usize) -> Self {
        Self {
            engine,
            page_size: page_size.max(1),
        }
    }

    /// Every distinct tag of `facet`, sorted by name then id.
    ///
    /// A failure on any page fails the whole walk; no partial list is
    /// returned.
    pub async fn enumerate(&self, facet: Facet) -> Result<Vec<Tag>> {
        let mut seen: BTreeMap<TagId, String> = BTreeMap::new();
        let mut after: Option<AfterKey> = None;
        let mut page = 0;
        loop {
            page += 1;
            let batch = self
                .engine
                .facet_page(facet, after.as_ref(), self.page_size)
                .await
                .map_err(|e| SearchError::FacetEnumeration {
                    facet,
                    page,
                    source: Box::new(e),
                })?;
            FACET_PAGES_TOTAL
                .with_label_values(&[&facet.to_string()])
                .inc();
            if batch.buckets.is_empty() {
                break;
            }
            for tag in batch.buckets {
                match seen.get(&tag.id) {
                    Some(name) if *name != tag.name => {
                        tracing::warn!(%facet, id = tag.id, kept = %name, dropped = %tag.name, "tag id with conflicting names");
                    }
                    Some(_) => {}
                    None => {
                        seen.insert(tag.id, tag.name);
                    }
                }
            }
            match batch.after_key {
                Some(key) if after.as_ref() != Some(&key) => after = Some(key),
                // an absent or repeated key would restart or stall the walk
                _ => break,
            }
        }
        tracing::info!(%facet, pages = page, tags = seen.len(), "facet enumerated");
        let mut tags: Vec<Tag> = seen.into_iter().map(|(id, name)| Tag { id, name }).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    /// Both facet vocabularies. The two walks run concurrently.
    pub async fn catalog(&self) -> Result<TagCatalog> {
        let (mechanics, themes) = futures::try_join!(
            self.enumerate(Facet::Mechanics),
            self.enumerate(Facet::Themes)
        )?;
        Ok(TagCatalog { mechanics, themes })
    }
}
