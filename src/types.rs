use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned position of an event within a job's output stream.
pub type Counter = u64;

/// One job event. Only `counter` carries meaning for paging; everything the
/// server sends beyond the typed fields is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub counter: Counter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn new(counter: Counter) -> Self {
        Self {
            counter,
            uuid: None,
            stdout: None,
            start_line: None,
            end_line: None,
            extra: Map::new(),
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }
}

/// A single response from the event API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub results: Vec<Event>,
    /// Total number of events matching the query. Range responses may omit it.
    #[serde(default)]
    pub count: u64,
}

/// Inclusive counter range `[low, high]`. An inverted range (`low > high`) is
/// a valid value that fetches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRange {
    pub low: Counter,
    pub high: Counter,
}

impl CounterRange {
    pub fn new(low: Counter, high: Counter) -> Self {
        Self { low, high }
    }

    pub fn is_inverted(&self) -> bool {
        self.low > self.high
    }
}

/// Highest counter in a batch, 0 when the batch is empty.
pub fn max_counter(events: &[Event]) -> Counter {
    events.iter().map(|e| e.counter).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_keeps_unknown_fields() {
        let json = r#"{"counter": 7, "stdout": "ok: [host]", "event": "runner_on_ok", "host_name": "web1"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.counter, 7);
        assert_eq!(event.stdout.as_deref(), Some("ok: [host]"));
        assert_eq!(event.extra.get("event"), Some(&Value::from("runner_on_ok")));
        assert_eq!(event.extra.get("host_name"), Some(&Value::from("web1")));
    }

    #[test]
    fn page_count_defaults_to_zero() {
        let page: Page = serde_json::from_str(r#"{"results": [{"counter": 1}]}"#).unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.results.len(), 1);
    }

    #[test]
    fn max_counter_of_empty_batch_is_zero() {
        assert_eq!(max_counter(&[]), 0);
        assert_eq!(max_counter(&[Event::new(3), Event::new(9), Event::new(4)]), 9);
    }
}
