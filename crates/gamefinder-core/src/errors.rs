use thiserror::Error;

use crate::model::Facet;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search engine unavailable: {0}")]
    Upstream(String),
    #[error("search engine timed out")]
    Timeout,
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
    #[error("{facet} enumeration failed on page {page}: {source}")]
    FacetEnumeration {
        facet: Facet,
        page: usize,
        #[source]
        source: Box<SearchError>,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl SearchError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Upstream(_) => "upstream",
            SearchError::Timeout => "timeout",
            SearchError::InvalidResponse(_) => "invalid_response",
            SearchError::FacetEnumeration { .. } => "facet_enumeration",
            SearchError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
