//! Glue between the sliding window, the rendered view and scroll hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app_config::{PagingConfig, ScrollConfig};
use crate::errors::SourceError;
use crate::render::ViewCounters;
use crate::scroll::{ScrollCoordinator, ScrollHooks, ScrollSettings, Viewport};
use crate::slide::{CounterSource, SlidingWindow};
use crate::source::{EventSource, EventTransport, PageQuery};

pub type Window<T> = SlidingWindow<Arc<EventSource<T>>, Arc<ViewCounters>>;

pub struct OutputPager<T> {
    source: Arc<EventSource<T>>,
    view: Arc<ViewCounters>,
    window: Window<T>,
    following: AtomicBool,
}

impl<T: EventTransport> OutputPager<T> {
    pub fn new(source: EventSource<T>) -> Self {
        Self::with_config(source, &PagingConfig::default())
    }

    pub fn with_config(source: EventSource<T>, paging: &PagingConfig) -> Self {
        let source = Arc::new(source.with_max_page_size(paging.max_page_size));
        let view = Arc::new(ViewCounters::new(paging.event_limit));
        let window = SlidingWindow::new(Arc::clone(&source), Arc::clone(&view))
            .with_page_size(paging.page_size)
            .with_capacity(paging.max_buffer_length);
        Self {
            source,
            view,
            window,
            following: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &EventSource<T> {
        &self.source
    }

    pub fn view(&self) -> &ViewCounters {
        &self.view
    }

    pub fn window(&self) -> &Window<T> {
        &self.window
    }

    /// Drive this pager's hooks from scroll notifications on `viewport`.
    pub fn coordinate<V: Viewport + 'static>(
        self: &Arc<Self>,
        viewport: Arc<V>,
        scroll: &ScrollConfig,
    ) -> ScrollCoordinator<V>
    where
        T: 'static,
    {
        ScrollCoordinator::new(viewport, Arc::clone(self), ScrollSettings::from(scroll))
    }

    pub fn is_following(&self) -> bool {
        self.following.load(Ordering::SeqCst)
    }

    pub fn set_following(&self, following: bool) {
        self.following.store(following, Ordering::SeqCst);
    }

    /// Render the first page.
    pub async fn start(&self) -> Result<usize, SourceError> {
        // Learn where the stream ends so forward ranges are not clamped short.
        self.source.fetch().await?;
        let first = self.window.get_first().await?;
        Ok(self.view.push_front(first))
    }

    /// Render the end of the stream and keep following it.
    pub async fn start_at_end(&self) -> Result<usize, SourceError> {
        let last = self.window.get_last().await?;
        let added = self.view.push_front(last);
        self.set_following(true);
        Ok(added)
    }

    /// Point at another job's event endpoint, dropping everything rendered
    /// and buffered for the previous one.
    pub fn switch_job(&self, endpoint: impl Into<String>, params: PageQuery) {
        self.view.clear();
        self.window.reset();
        self.source.init(endpoint, params);
        self.set_following(false);
    }

    /// The job reported it is still producing output; cached tails are stale.
    pub fn on_job_running(&self) {
        self.source.clear_cache();
    }

    /// Re-read the end of a running job so the window knows how far the
    /// stream reaches, then load past the tail when following.
    pub async fn refresh(&self) -> Result<usize, SourceError> {
        self.on_job_running();
        let last = self.source.fetch().await?;
        self.window.push_frames(last);
        if !self.is_following() {
            return Ok(0);
        }
        self.load_next().await
    }

    /// Fetch past the tail and render it, trimming the oldest rows past the limit.
    pub async fn load_next(&self) -> Result<usize, SourceError> {
        self.sync_stream_end().await?;
        let fetched = self.window.get_next(self.window.page_size()).await?;
        let high = fetched.range.high;
        let Some(mut fresh) = self.window.commit(fetched) else {
            return Ok(0);
        };
        // Outside follow mode only the requested range is rendered; the rest of
        // the buffer past the tail is streamed output we have not scrolled to.
        if !self.is_following() {
            fresh.retain(|e| e.counter <= high);
        }
        let added = self.view.push_front(fresh);
        self.view.pop_back(self.view.overflow());
        Ok(added)
    }

    /// Fetch before the head and render it, trimming the newest rows past the limit.
    pub async fn load_previous(&self) -> Result<usize, SourceError> {
        if self.window.is_on_first_page() {
            return Ok(0);
        }
        let fetched = self.window.get_previous(self.window.page_size()).await?;
        if fetched.epoch != self.window.epoch() {
            return Ok(0);
        }
        let added = self.view.push_back(fetched.events);
        self.view.pop_front(self.view.overflow());
        if added > 0 {
            self.set_following(false);
        }
        Ok(added)
    }

    /// Once older appends are trimmed the buffer's max can fall behind the
    /// API's high-water mark; re-push the (cached) tail page to restore it.
    async fn sync_stream_end(&self) -> Result<(), SourceError> {
        if self.window.get_max_counter() < self.source.get_max_counter() {
            let last = self.source.fetch().await?;
            self.window.push_frames(last);
        }
        Ok(())
    }

    pub fn head_counter(&self) -> u64 {
        self.view.head_counter()
    }

    pub fn tail_counter(&self) -> u64 {
        self.view.tail_counter()
    }
}

#[async_trait::async_trait]
impl<T: EventTransport + 'static> ScrollHooks for OutputPager<T> {
    async fn next(&self) -> anyhow::Result<()> {
        let added = self.load_next().await?;
        let tail = self.tail_counter();
        log::debug!("next: rendered {added} events, tail {tail}");
        // Scrolling down onto the end of the stream resumes following it.
        if tail > 0 && tail >= self.source.get_max_counter() {
            self.set_following(true);
        }
        Ok(())
    }

    async fn previous(&self) -> anyhow::Result<()> {
        let added = self.load_previous().await?;
        log::debug!("previous: rendered {added} events, head {}", self.head_counter());
        Ok(())
    }

    async fn on_threshold_leave(&self) -> anyhow::Result<()> {
        self.set_following(false);
        Ok(())
    }
}
