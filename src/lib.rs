pub mod app_config;
pub mod config;
mod errors;
pub mod pager;
pub mod render;
pub mod scroll;
pub mod slide;
pub mod source;
mod types;

pub use crate::app_config::OutputConfig;
pub use crate::errors::{ScrollError, SourceError};
pub use crate::pager::OutputPager;
pub use crate::render::ViewCounters;
pub use crate::scroll::{
    ScrollCoordinator, ScrollHooks, ScrollSettings, Transition, VirtualViewport,
};
pub use crate::slide::{CounterSource, EventApi, Fetched, SlidingWindow};
pub use crate::source::{EventSource, EventTransport, HttpTransport, MemoryTransport, PageQuery};
pub use crate::types::{Counter, CounterRange, Event, Page};

/// Initialize `env_logger`: `RUST_LOG` is honored, warnings and up otherwise.
pub fn init_logging() {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Warn);
    }
    let _ = builder.try_init();
}
