//! Bounded look-ahead/look-behind buffer around the visible counter range.
//!
//! The window never tracks what is on screen itself: head and tail always come
//! from a [`CounterSource`]. Fetching (`get_next`/`get_previous`) and merging
//! (`push_frames`/`commit`) are separate steps so the caller decides when the
//! buffer changes relative to rendering.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{OUTPUT_MAX_BUFFER_LENGTH, OUTPUT_PAGE_SIZE};
use crate::errors::SourceError;
use crate::source::{EventSource, EventTransport};
use crate::types::{Counter, CounterRange, Event};

/// The event-fetching capabilities the window needs.
#[async_trait::async_trait]
pub trait EventApi: Send + Sync {
    async fn get_range(&self, range: Option<CounterRange>) -> Result<Vec<Event>, SourceError>;
    async fn get_first(&self) -> Result<Vec<Event>, SourceError>;
    async fn get_last(&self) -> Result<Vec<Event>, SourceError>;
    fn get_max_counter(&self) -> Counter;
}

#[async_trait::async_trait]
impl<T: EventTransport> EventApi for EventSource<T> {
    async fn get_range(&self, range: Option<CounterRange>) -> Result<Vec<Event>, SourceError> {
        EventSource::get_range(self, range).await
    }

    async fn get_first(&self) -> Result<Vec<Event>, SourceError> {
        EventSource::get_first(self).await
    }

    async fn get_last(&self) -> Result<Vec<Event>, SourceError> {
        EventSource::get_last(self).await
    }

    fn get_max_counter(&self) -> Counter {
        EventSource::get_max_counter(self)
    }
}

#[async_trait::async_trait]
impl<A: EventApi + ?Sized> EventApi for Arc<A> {
    async fn get_range(&self, range: Option<CounterRange>) -> Result<Vec<Event>, SourceError> {
        (**self).get_range(range).await
    }

    async fn get_first(&self) -> Result<Vec<Event>, SourceError> {
        (**self).get_first().await
    }

    async fn get_last(&self) -> Result<Vec<Event>, SourceError> {
        (**self).get_last().await
    }

    fn get_max_counter(&self) -> Counter {
        (**self).get_max_counter()
    }
}

/// First and last counter currently rendered. 0 means nothing is rendered.
pub trait CounterSource: Send + Sync {
    fn head_counter(&self) -> Counter;
    fn tail_counter(&self) -> Counter;
}

impl<C: CounterSource + ?Sized> CounterSource for Arc<C> {
    fn head_counter(&self) -> Counter {
        (**self).head_counter()
    }

    fn tail_counter(&self) -> Counter {
        (**self).tail_counter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    pub events: Vec<Event>,
    pub min: Counter,
    pub max: Counter,
    pub count: usize,
}

/// Events fetched by the window, stamped with the buffer epoch at dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub epoch: u64,
    pub range: CounterRange,
    pub events: Vec<Event>,
}

#[derive(Debug, Default)]
struct WindowInner {
    buffer: Buffer,
    first: Option<Vec<Event>>,
    epoch: u64,
}

pub struct SlidingWindow<A, C> {
    api: A,
    storage: C,
    page_size: u64,
    capacity: usize,
    inner: Mutex<WindowInner>,
}

impl<A: EventApi, C: CounterSource> SlidingWindow<A, C> {
    pub fn new(api: A, storage: C) -> Self {
        Self {
            api,
            storage,
            page_size: OUTPUT_PAGE_SIZE,
            capacity: OUTPUT_MAX_BUFFER_LENGTH,
            inner: Mutex::new(WindowInner::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn storage(&self) -> &C {
        &self.storage
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Drop the buffer and the first-page cache.
    pub fn reset(&self) {
        let mut inner = self.inner();
        inner.buffer = Buffer::default();
        inner.first = None;
        inner.epoch += 1;
    }

    pub fn epoch(&self) -> u64 {
        self.inner().epoch
    }

    pub fn buffer(&self) -> Buffer {
        self.inner().buffer.clone()
    }

    /// Clamp a range to `[1, get_max_counter()]`.
    pub fn get_bounded_range(&self, range: CounterRange) -> CounterRange {
        CounterRange::new(range.low.max(1), range.high.min(self.get_max_counter()))
    }

    pub fn get_next_range(&self, displacement: u64) -> CounterRange {
        let tail = self.storage.tail_counter();
        let low = tail + 1;
        self.get_bounded_range(CounterRange::new(low, low + displacement))
    }

    /// May come back inverted when head is near the start of the stream.
    pub fn get_previous_range(&self, displacement: u64) -> CounterRange {
        let head = self.storage.head_counter();
        let high = head.saturating_sub(1);
        self.get_bounded_range(CounterRange::new(high.saturating_sub(displacement), high))
    }

    pub async fn get_next(&self, displacement: u64) -> Result<Fetched, SourceError> {
        let range = self.get_next_range(displacement);
        self.get_range(range).await
    }

    pub async fn get_previous(&self, displacement: u64) -> Result<Fetched, SourceError> {
        let range = self.get_previous_range(displacement);
        self.get_range(range).await
    }

    async fn get_range(&self, range: CounterRange) -> Result<Fetched, SourceError> {
        let epoch = self.epoch();
        let events = self.api.get_range(Some(range)).await?;
        Ok(Fetched {
            epoch,
            range,
            events,
        })
    }

    /// Merge a fetched batch, unless the buffer was cleared while it was in flight.
    pub fn commit(&self, fetched: Fetched) -> Option<Vec<Event>> {
        let current = self.epoch();
        if fetched.epoch != current {
            log::debug!(
                "discarding {} events fetched in epoch {} (now {current})",
                fetched.events.len(),
                fetched.epoch
            );
            return None;
        }
        Some(self.push_frames(fetched.events))
    }

    /// The first page, cached once it is known to be full.
    pub async fn get_first(&self) -> Result<Vec<Event>, SourceError> {
        if let Some(first) = self.inner().first.clone() {
            return Ok(first);
        }

        let events = self.api.get_first().await?;
        if events.len() as u64 == self.page_size {
            self.inner().first = Some(events.clone());
        }
        Ok(events)
    }

    /// Buffered frames when there are any, else the last page from the API.
    pub async fn get_last(&self) -> Result<Vec<Event>, SourceError> {
        let frames = self.get_frames();
        if !frames.is_empty() {
            return Ok(frames);
        }
        self.api.get_last().await
    }

    /// Append `events` to the buffer, dropping the oldest-appended entries past
    /// capacity. Returns the retained events newer than the visible tail, or all
    /// of them when head and tail coincide.
    pub fn push_frames(&self, events: Vec<Event>) -> Vec<Event> {
        let head = self.storage.head_counter();
        let tail = self.storage.tail_counter();

        let mut inner = self.inner();
        let buffer = &mut inner.buffer;
        buffer.events.extend(events);
        if buffer.events.len() > self.capacity {
            let excess = buffer.events.len() - self.capacity;
            buffer.events.drain(..excess);
        }

        let (min, max) = buffer
            .events
            .iter()
            .rev()
            .fold((None, 0), |(min, max), e| {
                let min = match min {
                    Some(m) if m <= e.counter => Some(m),
                    _ => Some(e.counter),
                };
                (min, max.max(e.counter))
            });
        buffer.min = min.unwrap_or(0);
        buffer.max = max;
        buffer.count = buffer.events.len();

        if head == tail {
            return buffer.events.clone();
        }
        buffer
            .events
            .iter()
            .filter(|e| e.counter > tail)
            .cloned()
            .collect()
    }

    /// Empty the buffer. Batches fetched before this call no longer commit.
    pub fn clear(&self) {
        let mut inner = self.inner();
        inner.buffer = Buffer::default();
        inner.epoch += 1;
    }

    pub fn get_frames(&self) -> Vec<Event> {
        self.inner().buffer.events.clone()
    }

    /// The buffer's max counter once it is past the cold-start values 0 and 1,
    /// otherwise the API's high-water mark.
    pub fn get_max_counter(&self) -> Counter {
        let max = self.inner().buffer.max;
        if max > 1 {
            return max;
        }
        self.api.get_max_counter()
    }

    pub fn is_on_last_page(&self) -> bool {
        let tail = self.storage.tail_counter();
        let min = self.inner().buffer.min;
        if min > 0 {
            return tail >= min - 1;
        }
        tail >= self.get_max_counter().saturating_sub(self.page_size)
    }

    pub fn is_on_first_page(&self) -> bool {
        self.storage.head_counter() == 1
    }

    fn inner(&self) -> MutexGuard<'_, WindowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryTransport, PageQuery};
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counters {
        head: AtomicU64,
        tail: AtomicU64,
    }

    impl Counters {
        fn set(&self, head: Counter, tail: Counter) {
            self.head.store(head, Ordering::SeqCst);
            self.tail.store(tail, Ordering::SeqCst);
        }
    }

    impl CounterSource for Counters {
        fn head_counter(&self) -> Counter {
            self.head.load(Ordering::SeqCst)
        }

        fn tail_counter(&self) -> Counter {
            self.tail.load(Ordering::SeqCst)
        }
    }

    type Window = SlidingWindow<Arc<EventSource<Arc<MemoryTransport>>>, Arc<Counters>>;

    struct Fixture {
        transport: Arc<MemoryTransport>,
        source: Arc<EventSource<Arc<MemoryTransport>>>,
        counters: Arc<Counters>,
        window: Window,
    }

    fn fixture(total: Counter) -> Fixture {
        let transport = Arc::new(MemoryTransport::with_events(events(1..=total)));
        let source = Arc::new(EventSource::new(Arc::clone(&transport)));
        source.init("/api/v2/jobs/7/job_events/", PageQuery::default());
        let counters = Arc::new(Counters::default());
        let window = SlidingWindow::new(Arc::clone(&source), Arc::clone(&counters));
        Fixture {
            transport,
            source,
            counters,
            window,
        }
    }

    fn events(counters: impl IntoIterator<Item = Counter>) -> Vec<Event> {
        counters.into_iter().map(Event::new).collect()
    }

    fn counters(events: &[Event]) -> Vec<Counter> {
        events.iter().map(|e| e.counter).collect()
    }

    #[test]
    fn push_frames_returns_everything_when_head_equals_tail() {
        let f = fixture(0);
        f.counters.set(10, 10);
        let out = f.window.push_frames(events([11, 12]));
        assert_eq!(counters(&out), vec![11, 12]);
    }

    #[test]
    fn push_frames_filters_events_already_visible() {
        let f = fixture(0);
        f.counters.set(5, 10);
        let out = f.window.push_frames(events([8, 11]));
        assert_eq!(counters(&out), vec![11]);
        assert_eq!(counters(&f.window.get_frames()), vec![8, 11]);
    }

    #[test]
    fn push_frames_trims_oldest_appended_past_capacity() {
        let f = fixture(0);
        let window = SlidingWindow::new(Arc::clone(&f.source), Arc::clone(&f.counters))
            .with_capacity(5);
        window.push_frames(events([20, 21, 22]));
        window.push_frames(events([1, 2, 3, 4]));
        let buffer = window.buffer();
        assert_eq!(counters(&buffer.events), vec![22, 1, 2, 3, 4]);
        assert_eq!((buffer.min, buffer.max, buffer.count), (1, 22, 5));
    }

    #[test]
    fn buffer_never_exceeds_default_capacity() {
        let f = fixture(0);
        for chunk in 0..30u64 {
            f.window.push_frames(events(chunk * 100 + 1..=chunk * 100 + 100));
            assert!(f.window.buffer().events.len() <= OUTPUT_MAX_BUFFER_LENGTH);
        }
        let buffer = f.window.buffer();
        assert_eq!(buffer.count, 1000);
        assert_eq!((buffer.min, buffer.max), (2001, 3000));
    }

    #[test]
    fn clear_resets_buffer() {
        let f = fixture(0);
        f.window.push_frames(events([1, 2, 3]));
        f.window.clear();
        assert_eq!(f.window.buffer(), Buffer::default());
    }

    #[tokio::test]
    async fn next_range_is_bounded_by_max_counter() {
        let f = fixture(100);
        f.source.get_first().await.unwrap();
        f.counters.set(1, 40);
        assert_eq!(f.window.get_next_range(50), CounterRange::new(41, 50));

        f.window.push_frames(events([90, 100]));
        f.counters.set(41, 90);
        assert_eq!(f.window.get_next_range(50), CounterRange::new(91, 100));
    }

    #[tokio::test]
    async fn previous_range_near_start_is_inverted_and_fetches_nothing() {
        let f = fixture(100);
        f.source.get_first().await.unwrap();
        f.counters.set(30, 50);
        assert_eq!(f.window.get_previous_range(50), CounterRange::new(1, 29));

        f.counters.set(1, 50);
        let range = f.window.get_previous_range(50);
        assert!(range.is_inverted());
        let calls = f.transport.call_count();
        let fetched = f.window.get_previous(50).await.unwrap();
        assert!(fetched.events.is_empty());
        assert_eq!(f.transport.call_count(), calls);
    }

    #[tokio::test]
    async fn get_next_does_not_touch_buffer() {
        let f = fixture(200);
        f.source.get_first().await.unwrap();
        f.counters.set(1, 50);
        f.source.get_range(Some(CounterRange::new(150, 200))).await.unwrap();

        let fetched = f.window.get_next(OUTPUT_PAGE_SIZE).await.unwrap();
        assert_eq!(counters(&fetched.events), (51..=101).collect::<Vec<_>>());
        assert!(f.window.get_frames().is_empty());

        let fresh = f.window.commit(fetched).unwrap();
        assert_eq!(fresh.len(), 51);
        assert_eq!(f.window.buffer().max, 101);
    }

    #[tokio::test]
    async fn commit_discards_batches_fetched_before_clear() {
        let f = fixture(200);
        f.source.get_first().await.unwrap();
        f.counters.set(1, 50);
        let fetched = f.window.get_next(OUTPUT_PAGE_SIZE).await.unwrap();
        f.window.clear();
        assert!(f.window.commit(fetched).is_none());
        assert!(f.window.get_frames().is_empty());
    }

    #[tokio::test]
    async fn full_first_page_is_cached() {
        let f = fixture(120);
        f.window.get_first().await.unwrap();
        let first = f.window.get_first().await.unwrap();
        assert_eq!(first.len(), 50);
        assert_eq!(f.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn short_first_page_is_not_cached() {
        let f = fixture(30);
        f.window.get_first().await.unwrap();
        f.transport.push(events(31..=40));
        let first = f.window.get_first().await.unwrap();
        assert_eq!(first.len(), 40);
        assert_eq!(f.transport.call_count(), 2);
    }

    #[tokio::test]
    async fn get_last_prefers_buffered_frames() {
        let f = fixture(120);
        let last = f.window.get_last().await.unwrap();
        assert_eq!(last.len(), 20);
        assert_eq!(f.transport.call_count(), 1);

        f.window.push_frames(events([118, 119, 120]));
        let last = f.window.get_last().await.unwrap();
        assert_eq!(counters(&last), vec![118, 119, 120]);
        assert_eq!(f.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn max_counter_falls_back_to_api_on_cold_start() {
        let f = fixture(120);
        f.source.get_first().await.unwrap();
        assert_eq!(f.window.get_max_counter(), 50);
        f.window.push_frames(events([1]));
        assert_eq!(f.window.get_max_counter(), 50);
        f.window.push_frames(events([75]));
        assert_eq!(f.window.get_max_counter(), 75);
    }

    #[test]
    fn on_last_page_uses_buffer_min() {
        let f = fixture(0);
        f.window.push_frames(events(40..=60));
        f.counters.set(1, 39);
        assert!(f.window.is_on_last_page());
        f.counters.set(1, 38);
        assert!(!f.window.is_on_last_page());
    }

    #[test]
    fn on_last_page_falls_back_to_page_heuristic() {
        let f = fixture(0);
        f.source.push_max_counter(&events([120]));
        f.counters.set(1, 70);
        assert!(f.window.is_on_last_page());
        f.counters.set(1, 69);
        assert!(!f.window.is_on_last_page());
    }

    #[test]
    fn on_first_page_iff_head_is_one() {
        let f = fixture(0);
        f.counters.set(1, 50);
        assert!(f.window.is_on_first_page());
        f.counters.set(2, 50);
        assert!(!f.window.is_on_first_page());
    }
}
