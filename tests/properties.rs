use std::sync::Arc;

use proptest::prelude::*;

use joboutput::{
    Counter, CounterRange, CounterSource, Event, EventSource, MemoryTransport, PageQuery,
    SlidingWindow,
};

struct Fixed(Counter, Counter);

impl CounterSource for Fixed {
    fn head_counter(&self) -> Counter {
        self.0
    }

    fn tail_counter(&self) -> Counter {
        self.1
    }
}

fn events(counters: &[Counter]) -> Vec<Event> {
    counters.iter().copied().map(Event::new).collect()
}

proptest! {
    #[test]
    fn max_counter_is_running_maximum(batches in prop::collection::vec(prop::collection::vec(1u64..5000, 0..40), 1..30)) {
        let source = EventSource::new(MemoryTransport::default());
        let mut expected = 0;
        for batch in &batches {
            let before = source.get_max_counter();
            source.push_max_counter(&events(batch));
            expected = batch.iter().copied().fold(expected, u64::max);
            prop_assert!(source.get_max_counter() >= before);
            prop_assert_eq!(source.get_max_counter(), expected);
        }
    }

    #[test]
    fn range_fetches_in_any_order_keep_max_monotonic(ranges in prop::collection::vec((1u64..600, 0u64..250), 1..12)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let all: Vec<Counter> = (1..=500).collect();
            let transport = Arc::new(MemoryTransport::with_events(events(&all)));
            let source = EventSource::new(Arc::clone(&transport));
            source.init("/api/v2/jobs/1/job_events/", PageQuery::default());

            let mut seen = 0;
            for &(low, width) in &ranges {
                let before = source.get_max_counter();
                let got = source.get_range(Some(CounterRange::new(low, low + width))).await.unwrap();
                seen = got.iter().map(|e| e.counter).fold(seen, u64::max);
                assert!(source.get_max_counter() >= before);
            }
            assert_eq!(source.get_max_counter(), seen);
        });
    }

    #[test]
    fn buffer_length_never_exceeds_capacity(batches in prop::collection::vec(prop::collection::vec(1u64..10_000, 0..400), 1..20)) {
        let source = Arc::new(EventSource::new(MemoryTransport::default()));
        let window = SlidingWindow::new(Arc::clone(&source), Fixed(0, 0));
        for batch in &batches {
            window.push_frames(events(batch));
            let buffer = window.buffer();
            prop_assert!(buffer.events.len() <= 1000);
            prop_assert_eq!(buffer.count, buffer.events.len());
            if !buffer.events.is_empty() {
                prop_assert!(buffer.min <= buffer.max);
            }
        }
    }

    #[test]
    fn inverted_ranges_never_hit_the_transport(low in 1u64..1000, gap in 1u64..1000) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = Arc::new(MemoryTransport::default());
        let source = EventSource::new(Arc::clone(&transport));
        let got = runtime
            .block_on(source.get_range(Some(CounterRange::new(low + gap, low))))
            .unwrap();
        prop_assert!(got.is_empty());
        prop_assert_eq!(transport.call_count(), 0);
    }
}
