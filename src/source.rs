//! Book sources: what the caller asks for, and how it maps onto the site.

use crate::error::{CrawlError, SourceError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use regex::Regex;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use url::Url;

/// Final segment of a detail page path: `b<digits>`. Whatever prefix the
/// site root carries comes before it.
static DETAIL_SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^b(\d+)$").expect("Invalid DETAIL_SEGMENT_REGEX"));

/// Any `b<digits>` segment inside a path.
static BOOK_SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/b(\d+)(?:/|$)").expect("Invalid BOOK_SEGMENT_REGEX"));

/// A reference to one book, either by numeric id or by detail page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookSource {
    ById(u32),
    ByUrl(String),
}

impl fmt::Display for BookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSource::ById(id) => write!(f, "id {}", id),
            BookSource::ByUrl(url) => f.write_str(url),
        }
    }
}

/// A source mapped to its canonical detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub id: String,
    pub url: Url,
}

impl BookSource {
    /// Resolves against the site root. Id sources synthesize
    /// `{base}/b{id}/`; URL sources must already point at a detail page.
    pub fn resolve(&self, base: &Url) -> Result<ResolvedSource, SourceError> {
        match self {
            BookSource::ById(id) => {
                let url = base
                    .join(&format!("b{}/", id))
                    .map_err(|_| SourceError::UnresolvableId(*id))?;
                Ok(ResolvedSource {
                    id: id.to_string(),
                    url,
                })
            }
            BookSource::ByUrl(raw) => {
                let url = Url::parse(raw).map_err(|e| SourceError::InvalidUrl {
                    url: raw.clone(),
                    message: e.to_string(),
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(SourceError::InvalidUrl {
                        url: raw.clone(),
                        message: format!("unsupported scheme '{}'", url.scheme()),
                    });
                }
                let id = url
                    .path_segments()
                    .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                    .and_then(|segment| DETAIL_SEGMENT_REGEX.captures(segment))
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .ok_or_else(|| SourceError::NotBookPage(raw.clone()))?;
                Ok(ResolvedSource { id, url })
            }
        }
    }
}

/// Extracts the digits of the `b<digits>` path segment, if any.
pub fn book_id_from_url(url: &Url) -> Option<String> {
    BOOK_SEGMENT_REGEX
        .captures(url.path())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A finite producer of book sources, consumed once per run.
///
/// Calling `sources` again starts over from the beginning.
#[async_trait]
pub trait SourceProducer: Send + Sync {
    async fn sources(&self) -> Result<BoxStream<'_, BookSource>, CrawlError>;
}

/// A plain inclusive range of book ids.
#[derive(Debug, Clone)]
pub struct IdRange {
    ids: RangeInclusive<u32>,
}

impl IdRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { ids: start..=end }
    }
}

#[async_trait]
impl SourceProducer for IdRange {
    async fn sources(&self) -> Result<BoxStream<'_, BookSource>, CrawlError> {
        Ok(stream::iter(self.ids.clone().map(BookSource::ById)).boxed())
    }
}
