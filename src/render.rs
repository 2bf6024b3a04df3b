//! Headless model of the rendered output: which event counters are on screen.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::OUTPUT_EVENT_LIMIT;
use crate::slide::CounterSource;
use crate::types::{Counter, CounterRange, Event};

/// Events currently rendered, keyed and ordered by counter.
#[derive(Debug)]
pub struct ViewCounters {
    limit: u64,
    rendered: Mutex<BTreeMap<Counter, Event>>,
}

impl Default for ViewCounters {
    fn default() -> Self {
        Self::new(OUTPUT_EVENT_LIMIT)
    }
}

impl ViewCounters {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            rendered: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Append events past the tail. Returns how many were added.
    pub fn push_front(&self, events: Vec<Event>) -> usize {
        let tail = self.tail_counter();
        self.insert(events.into_iter().filter(|e| e.counter > tail))
    }

    /// Add events outside the rendered range, typically older ones.
    pub fn push_back(&self, events: Vec<Event>) -> usize {
        let head = self.head_counter();
        let tail = self.tail_counter();
        self.insert(
            events
                .into_iter()
                .filter(|e| e.counter < head || e.counter > tail),
        )
    }

    /// Drop up to `count` of the highest counters.
    pub fn pop_front(&self, count: usize) -> usize {
        let mut rendered = self.rendered();
        let mut removed = 0;
        while removed < count && rendered.pop_last().is_some() {
            removed += 1;
        }
        removed
    }

    /// Drop up to `count` of the lowest counters.
    pub fn pop_back(&self, count: usize) -> usize {
        let mut rendered = self.rendered();
        let mut removed = 0;
        while removed < count && rendered.pop_first().is_some() {
            removed += 1;
        }
        removed
    }

    pub fn clear(&self) {
        self.rendered().clear();
    }

    pub fn len(&self) -> usize {
        self.rendered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered().is_empty()
    }

    /// How many more counters fit between head and tail before the limit.
    pub fn capacity(&self) -> u64 {
        let rendered = self.rendered();
        let span = match (rendered.keys().next(), rendered.keys().next_back()) {
            (Some(head), Some(tail)) => tail - head,
            _ => 0,
        };
        self.limit.saturating_sub(span)
    }

    /// Rendered count beyond the limit.
    pub fn overflow(&self) -> usize {
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        self.len().saturating_sub(limit)
    }

    pub fn events(&self) -> Vec<Event> {
        self.rendered().values().cloned().collect()
    }

    pub fn counters(&self) -> Vec<Counter> {
        self.rendered().keys().copied().collect()
    }

    /// Counter ranges between head and tail that are not rendered.
    pub fn gaps(&self) -> Vec<CounterRange> {
        let rendered = self.rendered();
        let mut gaps = Vec::new();
        let mut previous: Option<Counter> = None;
        for &counter in rendered.keys() {
            if let Some(prev) = previous {
                if counter > prev + 1 {
                    gaps.push(CounterRange::new(prev + 1, counter - 1));
                }
            }
            previous = Some(counter);
        }
        gaps
    }

    fn insert(&self, events: impl Iterator<Item = Event>) -> usize {
        let mut rendered = self.rendered();
        let mut added = 0;
        for event in events {
            if rendered.insert(event.counter, event).is_none() {
                added += 1;
            }
        }
        added
    }

    fn rendered(&self) -> MutexGuard<'_, BTreeMap<Counter, Event>> {
        self.rendered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CounterSource for ViewCounters {
    fn head_counter(&self) -> Counter {
        self.rendered().keys().next().copied().unwrap_or(0)
    }

    fn tail_counter(&self) -> Counter {
        self.rendered().keys().next_back().copied().unwrap_or(0)
    }
}
