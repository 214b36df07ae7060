pub mod fetcher;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod scrapers;
pub mod state;

pub use fetcher::{HttpFetcher, PageFetcher};
pub use logging::{init_logging, LogConfig};
pub use manager::{CollectionReport, CollectorConfig, ScraperManager, SourceOutcome};
pub use registry::{default_sources, load_sources};
pub use scrapers::SourceScraper;
pub use state::RunState;

pub mod prelude {
    pub use super::{CollectorConfig, HttpFetcher, PageFetcher, ScraperManager};
    pub use nf_core::{Article, Error, Result, SourceDescriptor};
}
