use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::SourceError;
use crate::types::{Event, Page};

use super::{EventTransport, PageQuery};

/// In-process event store answering page requests the way the event API does:
/// counter-range filter, sort on counter, then page slicing. Every request is
/// recorded, which makes it a convenient stand-in for the HTTP transport.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    events: Mutex<Vec<Event>>,
    calls: Mutex<Vec<PageQuery>>,
    failure: Mutex<Option<u16>>,
}

impl MemoryTransport {
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    /// Append events, as a running job would.
    pub fn push(&self, events: Vec<Event>) {
        lock(&self.events).extend(events);
    }

    /// Make the next request fail with the given HTTP status.
    pub fn fail_next(&self, status: u16) {
        *lock(&self.failure) = Some(status);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_query(&self) -> Option<PageQuery> {
        lock(&self.calls).last().cloned()
    }
}

#[async_trait::async_trait]
impl EventTransport for MemoryTransport {
    async fn fetch_page(&self, _endpoint: &str, query: &PageQuery) -> Result<Page, SourceError> {
        lock(&self.calls).push(query.clone());

        if let Some(status) = lock(&self.failure).take() {
            return Err(SourceError::Status {
                status,
                body: "injected failure".to_string(),
            });
        }

        let mut matching: Vec<Event> = lock(&self.events)
            .iter()
            .filter(|e| match query.counter_range {
                Some(range) => e.counter >= range.low && e.counter <= range.high,
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.counter);
        if query.order_by.descending {
            matching.reverse();
        }

        let count = matching.len() as u64;
        let page_size = query.page_size.max(1) as usize;
        let page = query.page.unwrap_or(1).max(1) as usize;
        let results = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(Page { results, count })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
