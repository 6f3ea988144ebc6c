//! Bookcrawl - book catalog downloader.
//!
//! This library provides functionality for:
//! - Discovering books listed in a paginated catalog section
//! - Parsing book detail pages into structured descriptors
//! - Downloading book texts and cover images over an unreliable network
//! - Saving a JSON snapshot of every descriptor collected in a run

pub mod config;
pub mod console;
pub mod crawler;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod parser;
pub mod source;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use console::Console;
pub use crawler::CategoryCrawler;
pub use downloader::ResourceDownloader;
pub use error::{
    ConfigError, CrawlError, DownloadError, FetchError, ParseError, SourceError, StoreError,
};
pub use fetcher::{Document, FetchOutcome, PageFetcher};
pub use orchestrator::{DownloadOrchestrator, RunOptions, RunSummary};
pub use parser::{BookDescriptor, BookPageParser};
pub use source::{BookSource, IdRange, SourceProducer};
pub use store::{DescriptionSnapshot, DescriptionStore};
