pub mod aggregator;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod playlist;
pub mod resolver;
pub mod title;

pub use aggregator::{AggregateRun, RunSummary, StreamAggregator, StreamRecord};
pub use config::ScrapeConfig;
pub use errors::{Result, ScrapeError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use playlist::{PlaylistVariant, PlaylistWriter};
