use std::collections::BTreeMap;

use crate::config::{OUTPUT_ORDER_BY, OUTPUT_PAGE_SIZE};
use crate::types::CounterRange;

/// Sort key for a page request. Serialized as `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn as_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Query parameters for one request against the event endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: u64,
    pub order_by: OrderBy,
    pub counter_range: Option<CounterRange>,
    /// Search/filter parameters passed through untouched.
    pub filters: BTreeMap<String, String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(OUTPUT_PAGE_SIZE, OUTPUT_ORDER_BY)
    }
}

impl PageQuery {
    pub fn new(page_size: u64, order_field: impl Into<String>) -> Self {
        Self {
            page: None,
            page_size,
            order_by: OrderBy::ascending(order_field),
            counter_range: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Base parameters with a fixed set of per-request overrides applied.
    pub fn merge(&self, overrides: &QueryOverrides) -> PageQuery {
        let mut merged = self.clone();
        if let Some(page) = overrides.page {
            merged.page = Some(page);
        }
        if let Some(page_size) = overrides.page_size {
            merged.page_size = page_size;
        }
        if let Some(descending) = overrides.descending {
            merged.order_by.descending = descending;
        }
        if let Some(range) = overrides.counter_range {
            merged.counter_range = Some(range);
        }
        merged
    }

    /// Ordered key/value pairs for the request URL.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        pairs.push(("page_size".to_string(), self.page_size.to_string()));
        pairs.push(("order_by".to_string(), self.order_by.as_param()));
        if let Some(range) = self.counter_range {
            pairs.push(("counter__gte".to_string(), range.low.to_string()));
            pairs.push(("counter__lte".to_string(), range.high.to_string()));
        }
        for (key, value) in &self.filters {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}

/// Per-request changes to a base [`PageQuery`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOverrides {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub descending: Option<bool>,
    pub counter_range: Option<CounterRange>,
}

impl QueryOverrides {
    pub fn page(page: u64) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn descending(mut self) -> Self {
        self.descending = Some(true);
        self
    }

    pub fn range(range: CounterRange, page_size: u64) -> Self {
        Self {
            page_size: Some(page_size),
            counter_range: Some(range),
            ..Self::default()
        }
    }
}
