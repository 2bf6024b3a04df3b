//! Paged access to a job's event stream.
//!
//! [`EventSource`] fetches pages by number, the last page (with rotation
//! correction for the descending request), or an inclusive counter range, and
//! keeps two pieces of telemetry: the last total `count` reported by the API
//! and the highest counter seen by any fetch.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod http;
pub mod memory;
pub mod query;

use crate::config::API_MAX_PAGE_SIZE;
use crate::errors::SourceError;
use crate::types::{Counter, CounterRange, Event, Page, max_counter};

pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use query::{OrderBy, PageQuery, QueryOverrides};

/// Anything that can answer a page request against an event endpoint.
#[async_trait::async_trait]
pub trait EventTransport: Send + Sync {
    async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Page, SourceError>;
}

#[async_trait::async_trait]
impl<T: EventTransport + ?Sized> EventTransport for std::sync::Arc<T> {
    async fn fetch_page(&self, endpoint: &str, query: &PageQuery) -> Result<Page, SourceError> {
        (**self).fetch_page(endpoint, query).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchState {
    pub count: u64,
    pub max_counter: Counter,
}

#[derive(Debug, Clone, Default)]
struct ResponseCache {
    last: Option<Vec<Event>>,
}

#[derive(Debug, Default)]
struct SourceInner {
    endpoint: String,
    params: PageQuery,
    state: FetchState,
    cache: ResponseCache,
}

pub struct EventSource<T> {
    transport: T,
    max_page_size: u64,
    inner: Mutex<SourceInner>,
}

impl<T: EventTransport> EventSource<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_page_size: API_MAX_PAGE_SIZE,
            inner: Mutex::new(SourceInner::default()),
        }
    }

    pub fn with_max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// Point the source at an endpoint and reset telemetry and cache.
    pub fn init(&self, endpoint: impl Into<String>, params: PageQuery) {
        let mut inner = self.inner();
        inner.endpoint = endpoint.into();
        inner.params = params;
        inner.state = FetchState::default();
        inner.cache = ResponseCache::default();
    }

    pub fn endpoint(&self) -> String {
        self.inner().endpoint.clone()
    }

    pub fn page_size(&self) -> u64 {
        self.inner().params.page_size
    }

    pub fn state(&self) -> FetchState {
        self.inner().state
    }

    pub fn get_count(&self) -> u64 {
        self.inner().state.count
    }

    pub fn get_max_counter(&self) -> Counter {
        self.inner().state.max_counter
    }

    pub fn get_last_page_number(&self) -> u64 {
        let inner = self.inner();
        let page_size = inner.params.page_size;
        if page_size == 0 {
            return 0;
        }
        inner.state.count.div_ceil(page_size)
    }

    /// Fetch the tail of the stream, memoized until [`clear_cache`](Self::clear_cache).
    pub async fn fetch(&self) -> Result<Vec<Event>, SourceError> {
        self.get_last().await
    }

    pub fn clear_cache(&self) {
        self.inner().cache = ResponseCache::default();
    }

    pub async fn get_first(&self) -> Result<Vec<Event>, SourceError> {
        let page = self.request(&QueryOverrides::page(1)).await?;
        Ok(self.accept_page(page))
    }

    /// Fetch page `number` in ascending order. Page numbers outside
    /// `1..=get_last_page_number()` resolve to nothing without a request.
    pub async fn get_page(&self, number: u64) -> Result<Vec<Event>, SourceError> {
        if number < 1 || number > self.get_last_page_number() {
            return Ok(Vec::new());
        }
        let page = self.request(&QueryOverrides::page(number)).await?;
        Ok(self.accept_page(page))
    }

    /// Fetch the last page by requesting page 1 in descending order.
    ///
    /// When the stream is longer than one page, the descending page is split at
    /// `count % page_size`: the leading part is kept if non-empty, otherwise the
    /// split-off part. Events keep the server's (descending) order.
    pub async fn get_last(&self) -> Result<Vec<Event>, SourceError> {
        if let Some(cached) = self.inner().cache.last.clone() {
            return Ok(cached);
        }

        let page = self.request(&QueryOverrides::page(1).descending()).await?;
        self.push_max_counter(&page.results);

        let page_size = self.page_size();
        let Page { mut results, count } = page;
        let rotated = if page_size > 0 && count > page_size {
            let split = usize::try_from(count % page_size)
                .unwrap_or(usize::MAX)
                .min(results.len());
            let spliced = results.split_off(split);
            if results.is_empty() { spliced } else { results }
        } else {
            results
        };

        let mut inner = self.inner();
        inner.state.count = count;
        inner.cache.last = Some(rotated.clone());
        Ok(rotated)
    }

    /// Fetch every event with `low <= counter <= high` in one round trip.
    /// A missing or inverted range resolves to nothing without a request.
    pub async fn get_range(&self, range: Option<CounterRange>) -> Result<Vec<Event>, SourceError> {
        let Some(range) = range else {
            return Ok(Vec::new());
        };
        if range.is_inverted() {
            return Ok(Vec::new());
        }

        let overrides = QueryOverrides::range(range, self.max_page_size);
        let page = self.request(&overrides).await?;
        self.push_max_counter(&page.results);
        Ok(page.results)
    }

    /// Raise the high-water mark to the batch's max counter and return the latter.
    pub fn push_max_counter(&self, events: &[Event]) -> Counter {
        let local = max_counter(events);
        let mut inner = self.inner();
        if local > inner.state.max_counter {
            inner.state.max_counter = local;
        }
        local
    }

    fn accept_page(&self, page: Page) -> Vec<Event> {
        self.push_max_counter(&page.results);
        self.inner().state.count = page.count;
        page.results
    }

    async fn request(&self, overrides: &QueryOverrides) -> Result<Page, SourceError> {
        let (endpoint, query) = {
            let inner = self.inner();
            (inner.endpoint.clone(), inner.params.merge(overrides))
        };
        log::debug!("fetching {endpoint} {:?}", query.to_pairs());
        self.transport.fetch_page(&endpoint, &query).await
    }

    fn inner(&self) -> MutexGuard<'_, SourceInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
