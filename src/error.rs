//! Error types for the Bookcrawl application.
//!
//! Every component boundary has its own `thiserror` enum so the
//! orchestrator can decide per variant whether an item is retried later,
//! skipped for good, or the whole run has to stop.

use thiserror::Error;

/// Classification of a failed HTTP exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection-level failure (DNS, reset, timeout). Worth trying again
    /// after a cooldown.
    #[error("Network failure: {0}")]
    Transient(String),

    /// The resource does not exist, either by status code or because the
    /// site silently redirected the request elsewhere.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FetchError {
    /// Returns true if this failure should arm the cooldown.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Error type for book detail page parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The required element isn't found in HTML
    #[error("Element not found: {0}")]
    MissingElement(&'static str),

    /// Heading text lacks the `::` between name and author.
    #[error("Title heading has no '::' separator: {0:?}")]
    MissingSeparator(String),

    /// Requested URL carries no `b<digits>` segment.
    #[error("No book id in URL: {0}")]
    MissingBookId(String),

    /// Cover image source could not be turned into an absolute URL.
    #[error("Invalid image URL {src:?}: {message}")]
    InvalidImageUrl { src: String, message: String },
}

/// A caller-supplied book source that cannot be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Not an absolute URL at all.
    #[error("Invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// A URL that is not a book detail page.
    #[error("Not a book page URL: {0}")]
    NotBookPage(String),

    /// Base URL could not be combined with the book id.
    #[error("Cannot build detail URL for id {0}")]
    UnresolvableId(u32),
}

/// Error type for saving text and image resources.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The HTTP exchange failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Writing the file failed
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Endpoint URL could not be built
    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),

    /// Target file name is not a single plain path component
    #[error("Refusing to write outside the target folder: {0:?}")]
    UnsafeFileName(String),
}

impl DownloadError {
    /// Returns true if this failure should arm the cooldown.
    pub fn is_transient(&self) -> bool {
        matches!(self, DownloadError::Fetch(err) if err.is_transient())
    }
}

/// Error type for catalog discovery.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The catalog start page could not be fetched.
    #[error("Catalog start page {url} unavailable: {source}")]
    StartPage {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A catalog URL could not be built.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

/// Error type for the description snapshot file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or write the snapshot file
    #[error("Snapshot file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize JSON
    #[error("Snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
