//! Infinite-scroll pager over the search API.
//!
//! The pager does no I/O. It hands out [`PageRequest`]s and is fed the
//! outcome through [`ClientPager::complete`]. Each request carries the filter
//! generation it was issued under; a completion for any other generation is
//! discarded, so a slow response for superseded filters never lands in the
//! result list.

use crate::codec;
use crate::filter::FilterSet;
use crate::page::{SearchPage, Total};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    First,
    More,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    Idle,
    Loading(LoadKind),
    Ready,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub filters: FilterSet,
    pub cursor: Vec<String>,
}

impl PageRequest {
    /// Query string for `/api/search`.
    pub fn query_string(&self) -> String {
        codec::encode_request(&self.filters, &self.cursor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Debug)]
pub struct ClientPager<T> {
    filters: FilterSet,
    state: PagerState,
    generation: u64,
    cursor: Vec<String>,
    hits: Vec<T>,
    total: Option<Total>,
    last_error: Option<String>,
}

impl<T> Default for ClientPager<T> {
    fn default() -> Self {
        Self::new(FilterSet::default())
    }
}

impl<T> ClientPager<T> {
    pub fn new(filters: FilterSet) -> Self {
        Self {
            filters,
            state: PagerState::Idle,
            generation: 0,
            cursor: Vec::new(),
            hits: Vec::new(),
            total: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn hits(&self) -> &[T] {
        &self.hits
    }

    pub fn total(&self) -> Option<Total> {
        self.total
    }

    pub fn cursor(&self) -> &[String] {
        &self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Loads the first page for the current filters.
    pub fn start(&mut self) -> PageRequest {
        self.generation += 1;
        self.cursor.clear();
        self.hits.clear();
        self.total = None;
        self.last_error = None;
        self.state = PagerState::Loading(LoadKind::First);
        tracing::debug!(generation = self.generation, "pager restarted");
        self.request()
    }

    /// Replaces the filter state. Any in-flight response becomes stale and
    /// the walk restarts from an empty cursor. Unchanged filters are a no-op
    /// once a walk has started.
    pub fn set_filters(&mut self, filters: FilterSet) -> Option<PageRequest> {
        if filters == self.filters && self.state != PagerState::Idle {
            return None;
        }
        self.filters = filters;
        Some(self.start())
    }

    /// Requests the next page. Only valid while `Ready` with a cursor.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if self.state != PagerState::Ready || self.cursor.is_empty() {
            return None;
        }
        self.state = PagerState::Loading(LoadKind::More);
        Some(self.request())
    }

    /// Re-issues the first page after it failed to load.
    pub fn retry(&mut self) -> Option<PageRequest> {
        match (self.state, &self.last_error) {
            (PagerState::Idle, Some(_)) => Some(self.start()),
            (PagerState::Ready, Some(_)) => self.load_more(),
            _ => None,
        }
    }

    /// Supersedes the in-flight request, if any, without touching results.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.state = match self.state {
            PagerState::Loading(LoadKind::First) => PagerState::Idle,
            PagerState::Loading(LoadKind::More) => PagerState::Ready,
            other => other,
        };
    }

    /// Applies the outcome of a request issued under `generation`.
    pub fn complete<E: fmt::Display>(
        &mut self,
        generation: u64,
        outcome: Result<SearchPage<T>, E>,
    ) -> Completion {
        let PagerState::Loading(kind) = self.state else {
            return Completion::Stale;
        };
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "discarding stale page");
            return Completion::Stale;
        }
        match outcome {
            Ok(page) => {
                let more = page.has_more(self.hits.len() as u64 + page.hits.len() as u64);
                self.hits.extend(page.hits);
                self.total = Some(page.total);
                self.cursor = page.next_cursor.unwrap_or_default();
                self.last_error = None;
                self.state = if more {
                    PagerState::Ready
                } else {
                    PagerState::Exhausted
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, ?kind, "page load failed");
                self.last_error = Some(e.to_string());
                self.state = match kind {
                    LoadKind::First => PagerState::Idle,
                    LoadKind::More => PagerState::Ready,
                };
            }
        }
        Completion::Applied
    }

    fn request(&self) -> PageRequest {
        PageRequest {
            generation: self.generation,
            filters: self.filters.clone(),
            cursor: self.cursor.clone(),
        }
    }
}
