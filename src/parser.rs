//! Book detail page parser.
//!
//! Turns a fetched `/b<id>/` page into a [`BookDescriptor`]. The page
//! heading reads `Name :: Author`; the cover sits under `.bookimage`;
//! reader comments and genre links are optional.

use crate::error::ParseError;
use crate::fetcher::Document;
use crate::source::book_id_from_url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Separator between book name and author in the page heading.
const TITLE_SEPARATOR: &str = "::";

/// Structured metadata for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDescriptor {
    pub id: String,
    /// Detail page the descriptor was parsed from.
    pub url: String,
    pub name: String,
    pub author: String,
    /// Absolute cover image URL.
    pub image_url: String,
    /// Percent-decoded last segment of `image_url`.
    pub image_file_name: String,
    pub comments: Vec<String>,
    pub genres: Vec<String>,
}

/// CSS selectors used for parsing.
struct Selectors {
    title: Selector,
    image: Selector,
    comment: Selector,
    genre: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            title: Selector::parse("#content h1").unwrap(),
            image: Selector::parse(".bookimage img").unwrap(),
            comment: Selector::parse(".texts .black").unwrap(),
            genre: Selector::parse("span.d_book a").unwrap(),
        }
    }
}

/// Parser for book detail pages.
pub struct BookPageParser {
    selectors: Selectors,
}

impl Default for BookPageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BookPageParser {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::new(),
        }
    }

    /// Parses a fetched detail page.
    ///
    /// `requested_url` supplies the book id; relative image paths resolve
    /// against `document.final_url`.
    pub fn parse(
        &self,
        document: &Document,
        requested_url: &Url,
    ) -> Result<BookDescriptor, ParseError> {
        let doc = Html::parse_document(&document.html);

        let (name, author) = self.extract_title(&doc)?;
        let image_url = self.extract_image_url(&doc, &document.final_url)?;
        let image_file_name = image_file_name(&image_url)?;
        let id = book_id_from_url(requested_url)
            .ok_or_else(|| ParseError::MissingBookId(requested_url.to_string()))?;

        Ok(BookDescriptor {
            id,
            url: requested_url.to_string(),
            name,
            author,
            image_url: image_url.to_string(),
            image_file_name,
            comments: collect_texts(doc.select(&self.selectors.comment)),
            genres: collect_texts(doc.select(&self.selectors.genre)),
        })
    }

    fn extract_title(&self, doc: &Html) -> Result<(String, String), ParseError> {
        let heading = doc
            .select(&self.selectors.title)
            .next()
            .ok_or(ParseError::MissingElement("title heading"))?;
        let text = heading.text().collect::<String>();

        let (name, author) = text
            .split_once(TITLE_SEPARATOR)
            .ok_or_else(|| ParseError::MissingSeparator(text.trim().to_string()))?;

        Ok((name.trim().to_string(), author.trim().to_string()))
    }

    fn extract_image_url(&self, doc: &Html, final_url: &Url) -> Result<Url, ParseError> {
        let src = doc
            .select(&self.selectors.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or(ParseError::MissingElement("cover image"))?;

        final_url
            .join(src.trim())
            .map_err(|e| ParseError::InvalidImageUrl {
                src: src.to_string(),
                message: e.to_string(),
            })
    }
}

/// Trimmed text of each element, in document order.
fn collect_texts<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    elements
        .map(|elem| elem.text().collect::<String>().trim().to_string())
        .collect()
}

/// Last non-empty path segment, percent-decoded. The decoded name must
/// stay a single path component.
fn image_file_name(image_url: &Url) -> Result<String, ParseError> {
    let segment = image_url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(|| ParseError::InvalidImageUrl {
            src: image_url.to_string(),
            message: "no file name in path".to_string(),
        })?;

    let name = urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ParseError::InvalidImageUrl {
            src: image_url.to_string(),
            message: format!("unsafe file name {:?}", name),
        });
    }
    Ok(name)
}
