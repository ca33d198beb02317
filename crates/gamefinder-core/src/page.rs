use crate::model::Game;
use serde::{Deserialize, Serialize};

/// Hits per search page.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    /// `value` is the exact number of matches.
    #[default]
    Eq,
    /// `value` is only a lower bound.
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Total {
    pub value: u64,
    #[serde(default)]
    pub relation: TotalRelation,
}

/// One page of search results plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T = Game> {
    pub hits: Vec<T>,
    pub total: Total,
    /// Cursor tokens of the last hit; `None` when the page was empty.
    #[serde(rename = "searchAfterKey", default)]
    pub next_cursor: Option<Vec<String>>,
}

impl<T> SearchPage<T> {
    /// Whether another page should be requested after `fetched` hits in
    /// total have been received, this page included.
    ///
    /// An exact total bounds the walk; a lower-bound total does not, in which
    /// case only an empty page stops it.
    pub fn has_more(&self, fetched: u64) -> bool {
        if self.hits.is_empty() || self.next_cursor.is_none() {
            return false;
        }
        match self.total.relation {
            TotalRelation::Eq => fetched < self.total.value,
            TotalRelation::Gte => true,
        }
    }
}
