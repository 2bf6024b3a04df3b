//! Scroll-driven pagination.
//!
//! The coordinator debounces scroll notifications, classifies the scroll depth
//! against bands near the top and bottom of the viewport, and hands the
//! resulting hook calls to a [`TransitionQueue`] so that no two fetches ever
//! overlap. After each batch of hooks it re-applies the scroll position to
//! account for content that was added or removed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

pub mod queue;
pub mod viewport;

use crate::app_config::ScrollConfig;
use crate::config::{OUTPUT_SCROLL_DELAY, OUTPUT_SCROLL_THRESHOLD};
use crate::errors::ScrollError;

pub use queue::TransitionQueue;
pub use viewport::{Viewport, VirtualViewport};

/// Callbacks the coordinator drives. Each runs to completion before the next
/// one starts.
#[async_trait::async_trait]
pub trait ScrollHooks: Send + Sync + 'static {
    /// Load output after the visible tail.
    async fn next(&self) -> anyhow::Result<()>;
    /// Load output before the visible head.
    async fn previous(&self) -> anyhow::Result<()>;
    /// The viewport moved away from the bottom band (or reached the top).
    async fn on_threshold_leave(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next,
    Previous,
    ThresholdLeave,
}

/// A value and the value it had at the previous observation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub previous: f64,
    pub current: f64,
}

impl Sample {
    fn push(&mut self, value: f64) {
        self.previous = self.current;
        self.current = value;
    }

    fn reset(&mut self, value: f64) {
        self.previous = value;
        self.current = value;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    pub paused: bool,
    pub locked: bool,
    pub hover: bool,
    pub hidden: bool,
    /// Scroll notifications swallowed by the debounce since the last evaluation.
    pub thrash: u32,
    /// Pixel offsets.
    pub position: Sample,
    /// Scroll depth, 0 at the top and 1 at the bottom.
    pub threshold: Sample,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSettings {
    pub delay: Duration,
    pub threshold: f64,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(OUTPUT_SCROLL_DELAY),
            threshold: OUTPUT_SCROLL_THRESHOLD,
        }
    }
}

impl From<&ScrollConfig> for ScrollSettings {
    fn from(config: &ScrollConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.delay_ms),
            threshold: config.threshold,
        }
    }
}

/// Decide which hooks a scroll step triggers, in execution order.
///
/// The list is built top-to-bottom (`previous`, leave, leave, `next`) and
/// reversed when the step is upward, so an upward arrival at the top runs
/// `on_threshold_leave` before `previous`.
pub fn plan_transitions(position: Sample, threshold: Sample, band: f64) -> Vec<Transition> {
    let upper = band;
    let lower = 1.0 - band;

    let entered_upper = threshold.current <= upper && threshold.previous > upper;
    let entered_lower = threshold.current >= lower && threshold.previous < lower;
    let left_lower = threshold.previous >= lower && threshold.current < lower;

    let mut plan = Vec::new();
    if position.current <= 0.0 || entered_upper {
        plan.push(Transition::Previous);
        plan.push(Transition::ThresholdLeave);
    }
    if left_lower {
        plan.push(Transition::ThresholdLeave);
    }
    if threshold.current >= 1.0 || entered_lower {
        plan.push(Transition::Next);
    }

    if position.current <= position.previous {
        plan.reverse();
    }
    plan
}

pub struct ScrollCoordinator<V> {
    viewport: Arc<V>,
    settings: ScrollSettings,
    queue: TransitionQueue,
    state: Mutex<ScrollState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Viewport + 'static> ScrollCoordinator<V> {
    /// Must be called inside a tokio runtime; the transition worker starts here.
    pub fn new<H: ScrollHooks>(viewport: Arc<V>, hooks: Arc<H>, settings: ScrollSettings) -> Self {
        let position = viewport.scroll_top();
        let coordinator = Self {
            viewport,
            settings,
            queue: TransitionQueue::spawn(hooks),
            state: Mutex::new(ScrollState::default()),
            timer: Mutex::new(None),
        };
        let threshold = coordinator.threshold_at(position);
        {
            let mut state = coordinator.state();
            state.position.reset(position);
            state.threshold.reset(threshold);
        }
        coordinator
    }

    pub fn viewport(&self) -> &Arc<V> {
        &self.viewport
    }

    pub fn state_snapshot(&self) -> ScrollState {
        *self.state()
    }

    /// Scroll notification. Restarts the debounce timer unless the
    /// coordinator is locked or the pointer is elsewhere.
    pub fn listen(self: &Arc<Self>) {
        {
            let state = self.state();
            if state.locked || !state.hover {
                return;
            }
        }

        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = timer.take() {
            if !pending.is_finished() {
                pending.abort();
                self.state().thrash += 1;
            }
        }

        let delay = self.settings.delay;
        let weak = Arc::downgrade(self);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The owning view may have dropped the coordinator meanwhile.
            let Some(this) = weak.upgrade() else {
                return;
            };
            // Detached so a later listen() cannot cancel a running evaluation.
            tokio::spawn(async move {
                if let Err(err) = this.register().await {
                    log::warn!("scroll transition failed: {err}");
                }
            });
        }));
    }

    /// Evaluate the current position, run the triggered hooks through the
    /// queue, then re-apply the position.
    pub async fn register(&self) -> Result<(), ScrollError> {
        let transitions = self.evaluate();
        if !transitions.is_empty() {
            log::debug!("scroll transitions {transitions:?}");
        }
        self.queue.submit(transitions).await?;
        self.set_scroll_position(self.viewport.scroll_top());
        Ok(())
    }

    fn evaluate(&self) -> Vec<Transition> {
        let position = self.viewport.scroll_top();
        let threshold = self.threshold_at(position);

        let mut state = self.state();
        if state.thrash > 0 {
            log::debug!("debounced {} scroll notifications", state.thrash);
        }
        state.thrash = 0;
        state.position.push(position);
        state.threshold.push(threshold);

        if state.paused {
            return Vec::new();
        }
        plan_transitions(state.position, state.threshold, self.settings.threshold)
    }

    pub fn lock(&self) {
        self.state().locked = true;
    }

    pub fn unlock(&self) {
        self.state().locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn pause(&self) {
        self.state().paused = true;
    }

    pub fn resume(&self) {
        self.state().paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn on_mouse_enter(&self) {
        self.state().hover = true;
    }

    pub fn on_mouse_leave(&self) {
        self.state().hover = false;
    }

    pub fn hide(&self) {
        self.viewport.set_scrollable(false);
        self.state().hidden = true;
    }

    pub fn unhide(&self) {
        self.viewport.set_scrollable(true);
        self.state().hidden = false;
    }

    pub fn move_up(&self) {
        let top = self.viewport.scroll_top() - self.viewport.client_height();
        self.set_scroll_position(top);
    }

    pub fn move_down(&self) {
        let top = self.viewport.scroll_top() + self.viewport.client_height();
        self.set_scroll_position(top);
    }

    pub fn scroll_to_bottom(&self) {
        self.set_scroll_position(self.viewport.scroll_height());
    }

    pub fn reset_scroll_position(&self) {
        self.viewport.set_scroll_top(0.0);
        let mut state = self.state();
        state.position.reset(0.0);
        state.threshold.reset(0.0);
    }

    /// Move to `top` (clamped) and make it the reference point for the next
    /// evaluation, so programmatic moves never count as user scrolling.
    pub fn set_scroll_position(&self, top: f64) {
        let top = top.clamp(0.0, self.scrollable_range().max(0.0));
        self.viewport.set_scroll_top(top);
        let threshold = self.threshold_at(top);
        let mut state = self.state();
        state.position.reset(top);
        state.threshold.reset(threshold);
    }

    pub fn get_scroll_position(&self) -> f64 {
        self.viewport.scroll_top()
    }

    pub fn get_threshold(&self) -> f64 {
        self.threshold_at(self.viewport.scroll_top())
    }

    pub fn is_beyond_upper_threshold(&self) -> bool {
        self.get_threshold() <= self.settings.threshold
    }

    pub fn is_beyond_lower_threshold(&self) -> bool {
        self.get_threshold() >= 1.0 - self.settings.threshold
    }

    /// Whether the rendered content is shorter than the viewport.
    pub fn is_missing(&self) -> bool {
        self.viewport.content_height() < self.viewport.client_height()
    }

    fn scrollable_range(&self) -> f64 {
        self.viewport.scroll_height() - self.viewport.client_height()
    }

    fn threshold_at(&self, position: f64) -> f64 {
        let range = self.scrollable_range();
        if range <= 0.0 {
            return 1.0;
        }
        position / range
    }

    fn state(&self) -> MutexGuard<'_, ScrollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> Drop for ScrollCoordinator<V> {
    fn drop(&mut self) {
        if let Some(pending) = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.abort();
        }
    }
}
