/// Page size ceiling the event API accepts; used for single round-trip range fetches.
pub const API_MAX_PAGE_SIZE: u64 = 200;
/// Normal page size for page-number fetches.
pub const OUTPUT_PAGE_SIZE: u64 = 50;
/// Sort key for event pages. The descending form is prefixed with `-`.
pub const OUTPUT_ORDER_BY: &str = "start_line";
/// Capacity of the sliding window's prefetch buffer.
pub const OUTPUT_MAX_BUFFER_LENGTH: usize = 1000;
/// Upper bound on events the view keeps rendered at once.
pub const OUTPUT_EVENT_LIMIT: u64 = 1000;
/// Debounce window for scroll notifications, in milliseconds.
pub const OUTPUT_SCROLL_DELAY: u64 = 100;
/// Proximity band near either edge, as a fraction of the scrollable range.
pub const OUTPUT_SCROLL_THRESHOLD: f64 = 0.1;
