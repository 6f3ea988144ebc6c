//! Download orchestration loop.
//!
//! Takes book sources one at a time, in order, and drives each through
//! fetch, parse, text download and image download. A failure only ever
//! ends the current source. Network failures additionally arm a cooldown
//! that delays the next request of any kind.

use crate::config::Config;
use crate::console::Console;
use crate::downloader::ResourceDownloader;
use crate::error::{ConfigError, DownloadError};
use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::parser::{BookDescriptor, BookPageParser};
use crate::source::BookSource;
use crate::store::DescriptionSnapshot;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Text download endpoint, relative to the site root.
const TEXT_ENDPOINT: &str = "txt.php";

/// Which resources to skip for every book.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub skip_text: bool,
    pub skip_images: bool,
}

/// Counters for the most recent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sources that produced a descriptor.
    pub books: usize,
    pub texts: usize,
    pub images: usize,
    /// Sources dropped before a descriptor was built.
    pub skipped: usize,
}

/// Drives book sources through the download pipeline.
pub struct DownloadOrchestrator {
    fetcher: PageFetcher,
    parser: BookPageParser,
    downloader: ResourceDownloader,
    console: Console,
    base_url: Url,
    text_endpoint: Url,
    books_dir: PathBuf,
    images_dir: PathBuf,
    cooldown_after_failure: Duration,
    /// Wait owed before the next request. Only this loop touches it.
    cooldown: Duration,
    summary: RunSummary,
}

impl DownloadOrchestrator {
    /// Creates an orchestrator writing into the configured destination.
    /// The text and image directories must already exist.
    pub fn new(
        config: &Config,
        fetcher: PageFetcher,
        console: Console,
    ) -> Result<Self, ConfigError> {
        let base_url = config.site.base()?;
        let text_endpoint = base_url
            .join(TEXT_ENDPOINT)
            .map_err(|e| ConfigError::InvalidValue {
                key: "site.base_url".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            downloader: ResourceDownloader::new(fetcher.clone()),
            fetcher,
            parser: BookPageParser::new(),
            console,
            base_url,
            text_endpoint,
            books_dir: config.paths.books_path(),
            images_dir: config.paths.images_path(),
            cooldown_after_failure: config.network.cooldown(),
            cooldown: Duration::ZERO,
            summary: RunSummary::default(),
        })
    }

    /// Counters from the last call to [`DownloadOrchestrator::run`].
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Processes every source in order and returns the descriptors built.
    pub async fn run<S>(&mut self, mut sources: S, options: RunOptions) -> DescriptionSnapshot
    where
        S: Stream<Item = BookSource> + Unpin,
    {
        let mut snapshot = DescriptionSnapshot::new();
        self.summary = RunSummary::default();
        self.cooldown = Duration::ZERO;

        while let Some(source) = sources.next().await {
            match self.process(&source, options).await {
                Some(book) => {
                    self.summary.books += 1;
                    snapshot.push(book);
                }
                None => self.summary.skipped += 1,
            }
        }

        snapshot
    }

    async fn process(
        &mut self,
        source: &BookSource,
        options: RunOptions,
    ) -> Option<BookDescriptor> {
        let resolved = match source.resolve(&self.base_url) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.console.error(&format!("Skipping {}: {}", source, err));
                return None;
            }
        };

        self.wait_cooldown().await;
        let document = match self.fetcher.fetch(&resolved.url).await {
            FetchOutcome::Document(document) => document,
            FetchOutcome::NotFound(reason) => {
                self.console
                    .error(&format!("Book {} does not exist: {}", resolved.id, reason));
                return None;
            }
            FetchOutcome::TransientFailure(reason) => {
                self.console.error(&format!(
                    "Book {} skipped, connection error: {}",
                    resolved.id, reason
                ));
                self.cooldown = self.cooldown_after_failure;
                return None;
            }
        };

        let book = match self.parser.parse(&document, &resolved.url) {
            Ok(book) => book,
            Err(err) => {
                self.console
                    .error(&format!("Book {} page unreadable: {}", resolved.id, err));
                return None;
            }
        };

        self.console
            .step(&format!("Book {}", self.console.book(&book.id, &book.name)));

        // Text and image are attempted independently of each other.
        if !options.skip_text {
            self.wait_cooldown().await;
            let display_name = format!("{}. {}", book.id, book.name);
            let result = self
                .downloader
                .save_text(
                    &self.text_endpoint,
                    &[("id", book.id.as_str())],
                    &display_name,
                    &self.books_dir,
                )
                .await;
            if self.record("text", &book.id, result) {
                self.summary.texts += 1;
            }
        }

        if !options.skip_images {
            self.wait_cooldown().await;
            let result = self
                .downloader
                .save_image_str(&book.image_url, &book.image_file_name, &self.images_dir)
                .await;
            if self.record("image", &book.id, result) {
                self.summary.images += 1;
            }
        }

        Some(book)
    }

    /// Logs a download result, arming the cooldown on network failures.
    fn record(&mut self, what: &str, id: &str, result: Result<PathBuf, DownloadError>) -> bool {
        match result {
            Ok(path) => {
                self.console
                    .info(&format!("Saved {} {}", what, path.display()));
                true
            }
            Err(err) => {
                if err.is_transient() {
                    self.cooldown = self.cooldown_after_failure;
                }
                self.console
                    .error(&format!("Book {} {} not saved: {}", id, what, err));
                false
            }
        }
    }

    /// Sleeps off any pending cooldown; the next request starts clean.
    async fn wait_cooldown(&mut self) {
        if !self.cooldown.is_zero() {
            self.console.info(&format!(
                "Cooling down for {:.1}s after a network failure",
                self.cooldown.as_secs_f64()
            ));
            tokio::time::sleep(self.cooldown).await;
        }
        self.cooldown = Duration::ZERO;
    }
}
