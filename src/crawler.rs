//! Catalog section crawler.
//!
//! Walks `/l55/`, `/l55/2/`, ... and yields one [`BookSource::ByUrl`] per
//! book cover link. Pages are fetched lazily, one at a time, in order.

use crate::console::Console;
use crate::error::{CrawlError, FetchError};
use crate::fetcher::{FetchOutcome, PageFetcher};
use crate::source::{BookSource, SourceProducer};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use scraper::{Html, Selector};
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

/// CSS selectors used for catalog pages.
struct Selectors {
    /// Numbered pagination links; the last one is the highest page.
    page_link: Selector,
    /// Anchor wrapping each book cover.
    book_link: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            page_link: Selector::parse("a.npage").unwrap(),
            book_link: Selector::parse(".bookimage a").unwrap(),
        }
    }
}

/// Discovers book pages listed in a catalog section.
pub struct CategoryCrawler {
    fetcher: PageFetcher,
    console: Console,
    selectors: Selectors,
    start_url: Url,
    start_page: u32,
    end_page: Option<u32>,
    page_cooldown: Duration,
}

/// Iteration state carried between pages of a discovery stream.
struct CrawlState<'a> {
    crawler: &'a CategoryCrawler,
    next_page: u32,
    end_page: u32,
    pending: VecDeque<Url>,
    cooldown: Duration,
}

impl CategoryCrawler {
    /// Creates a crawler for pages `start_page..=end_page` of the section
    /// at `start_url`. Without an end page the whole section is walked.
    pub fn new(
        fetcher: PageFetcher,
        console: Console,
        start_url: Url,
        start_page: u32,
        end_page: Option<u32>,
        page_cooldown: Duration,
    ) -> Self {
        Self {
            fetcher,
            console,
            selectors: Selectors::new(),
            start_url,
            start_page: start_page.max(1),
            end_page,
            page_cooldown,
        }
    }

    /// Fetches the first catalog page and starts a lazy discovery stream.
    ///
    /// The last page visited is the larger of the configured end page and
    /// the highest page number in the pagination control.
    pub async fn discover(&self) -> Result<BoxStream<'_, BookSource>, CrawlError> {
        let start_url = &self.start_url;
        let max_page = match self.fetcher.fetch(start_url).await {
            FetchOutcome::Document(doc) => self.extract_max_page(&doc.html),
            FetchOutcome::NotFound(reason) => {
                return Err(CrawlError::StartPage {
                    url: start_url.to_string(),
                    source: FetchError::NotFound(reason),
                });
            }
            FetchOutcome::TransientFailure(reason) => {
                return Err(CrawlError::StartPage {
                    url: start_url.to_string(),
                    source: FetchError::Transient(reason),
                });
            }
        };
        let last_page = self.end_page.map_or(max_page, |end| end.max(max_page));

        self.console.info(&format!(
            "Catalog has {} pages, crawling {} to {}",
            max_page, self.start_page, last_page
        ));

        let state = CrawlState {
            crawler: self,
            next_page: self.start_page,
            end_page: last_page,
            pending: VecDeque::new(),
            cooldown: Duration::ZERO,
        };

        Ok(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(url) = state.pending.pop_front() {
                    return Some((BookSource::ByUrl(url.to_string()), state));
                }
                if state.next_page > state.end_page {
                    return None;
                }

                let page = state.next_page;
                state.next_page += 1;

                if !state.cooldown.is_zero() {
                    tokio::time::sleep(state.cooldown).await;
                    state.cooldown = Duration::ZERO;
                }

                match state.crawler.crawl_page(page).await {
                    Ok(links) => state.pending.extend(links),
                    Err(err) if err.is_transient() => {
                        state.cooldown = state.crawler.page_cooldown;
                    }
                    Err(_) => {}
                }
            }
        })
        .boxed())
    }

    /// Fetches one catalog page and logs the outcome.
    async fn crawl_page(&self, page: u32) -> Result<Vec<Url>, FetchError> {
        let url = page_url(&self.start_url, page).map_err(|err| {
            self.console.error(&err.to_string());
            FetchError::NotFound(err.to_string())
        })?;

        match self.fetcher.fetch(&url).await {
            FetchOutcome::Document(doc) => {
                let links = self.extract_book_links(&doc.html, &doc.final_url);
                self.console.step(&format!(
                    "Catalog page {}: {} books",
                    page,
                    self.console.count(links.len())
                ));
                Ok(links)
            }
            FetchOutcome::NotFound(reason) => {
                self.console
                    .error(&format!("Catalog page {} does not exist: {}", page, reason));
                Err(FetchError::NotFound(reason))
            }
            FetchOutcome::TransientFailure(reason) => {
                self.console.error(&format!(
                    "Catalog page {} skipped, connection error: {}",
                    page, reason
                ));
                Err(FetchError::Transient(reason))
            }
        }
    }

    /// Highest page number in the pagination control, 1 when absent.
    fn extract_max_page(&self, html: &str) -> u32 {
        let doc = Html::parse_document(html);
        doc.select(&self.selectors.page_link)
            .last()
            .and_then(|a| a.text().collect::<String>().trim().parse::<u32>().ok())
            .unwrap_or(1)
    }

    /// Book cover links, resolved against the page's final URL.
    fn extract_book_links(&self, html: &str, final_url: &Url) -> Vec<Url> {
        let doc = Html::parse_document(html);
        doc.select(&self.selectors.book_link)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| final_url.join(href.trim()).ok())
            .collect()
    }
}

#[async_trait]
impl SourceProducer for CategoryCrawler {
    async fn sources(&self) -> Result<BoxStream<'_, BookSource>, CrawlError> {
        self.discover().await
    }
}

/// Page 1 is the section root; page N is `<root>/N/`.
fn page_url(start_url: &Url, page: u32) -> Result<Url, CrawlError> {
    if page <= 1 {
        return Ok(start_url.clone());
    }
    start_url
        .join(&format!("{}/", page))
        .map_err(|e| CrawlError::InvalidUrl(format!("{} page {}: {}", start_url, page, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use std::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_page(books: &[u32], max_page: u32) -> String {
        let covers: String = books
            .iter()
            .map(|id| {
                format!(
                    r#"<div class="bookimage"><a href="/b{id}/"><img src="/shots/{id}.jpg"></a></div>"#
                )
            })
            .collect();
        let pager: String = (1..=max_page)
            .map(|n| format!(r#"<a class="npage" href="/l55/{n}/">{n}</a>"#))
            .collect();
        format!("<html><body>{covers}<p class=\"center\">{pager}</p></body></html>")
    }

    fn crawler(
        server: &MockServer,
        start: u32,
        end: Option<u32>,
        cooldown: Duration,
    ) -> CategoryCrawler {
        let fetcher = PageFetcher::new(&NetworkConfig {
            request_timeout_sec: 0.2,
            ..NetworkConfig::default()
        })
        .unwrap();
        let start_url = Url::parse(&format!("{}/l55/", server.uri())).unwrap();
        CategoryCrawler::new(
            fetcher,
            Console::with_colors(false),
            start_url,
            start,
            end,
            cooldown,
        )
    }

    async fn mount_page(server: &MockServer, route: &str, body: String, hits: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[test]
    fn test_page_url() {
        let start = Url::parse("https://tululu.org/l55/").unwrap();
        assert_eq!(page_url(&start, 1).unwrap(), start);
        assert_eq!(page_url(&start, 4).unwrap().as_str(), "https://tululu.org/l55/4/");
    }

    #[tokio::test]
    async fn test_larger_end_page_wins() {
        let server = MockServer::start().await;
        // Page 1 is fetched twice: once for pagination, once for books.
        mount_page(&server, "/l55/", catalog_page(&[1, 2], 5), 2).await;
        for page in 2..=5u32 {
            mount_page(
                &server,
                &format!("/l55/{}/", page),
                catalog_page(&[page * 10], 5),
                1,
            )
            .await;
        }

        let crawler = crawler(&server, 1, Some(3), Duration::ZERO);
        let sources: Vec<BookSource> = crawler.sources().await.unwrap().collect().await;

        let expected: Vec<BookSource> = [1, 2, 20, 30, 40, 50]
            .iter()
            .map(|id| BookSource::ByUrl(format!("{}/b{}/", server.uri(), id)))
            .collect();
        assert_eq!(sources, expected);
    }

    #[tokio::test]
    async fn test_discover_restarts_from_configured_page() {
        let server = MockServer::start().await;
        mount_page(&server, "/l55/", catalog_page(&[1], 3), 2).await;
        mount_page(&server, "/l55/2/", catalog_page(&[2], 3), 2).await;
        mount_page(&server, "/l55/3/", catalog_page(&[3], 3), 2).await;

        let crawler = crawler(&server, 2, None, Duration::ZERO);
        let first: Vec<BookSource> = crawler.discover().await.unwrap().collect().await;
        let second: Vec<BookSource> = crawler.sources().await.unwrap().collect().await;

        let expected: Vec<BookSource> = [2, 3]
            .iter()
            .map(|id| BookSource::ByUrl(format!("{}/b{}/", server.uri(), id)))
            .collect();
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[tokio::test]
    async fn test_end_page_beyond_pagination() {
        let server = MockServer::start().await;
        mount_page(&server, "/l55/", catalog_page(&[1], 2), 1).await;
        mount_page(&server, "/l55/2/", catalog_page(&[2], 2), 0).await;
        mount_page(&server, "/l55/3/", catalog_page(&[3], 2), 1).await;
        mount_page(&server, "/l55/4/", catalog_page(&[4], 2), 1).await;

        let crawler = crawler(&server, 3, Some(4), Duration::ZERO);
        let sources: Vec<BookSource> = crawler.sources().await.unwrap().collect().await;
        assert_eq!(sources.len(), 2);
        assert_eq!(
            sources[0],
            BookSource::ByUrl(format!("{}/b3/", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_missing_page_is_skipped_without_delay() {
        let server = MockServer::start().await;
        mount_page(&server, "/l55/", catalog_page(&[1], 3), 2).await;
        Mock::given(method("GET"))
            .and(path("/l55/2/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_page(&server, "/l55/3/", catalog_page(&[3], 3), 1).await;

        let crawler = crawler(&server, 1, None, Duration::from_secs(30));
        let started = Instant::now();
        let sources: Vec<BookSource> = crawler.sources().await.unwrap().collect().await;

        assert_eq!(sources.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_page_delays_next_page() {
        let server = MockServer::start().await;
        mount_page(&server, "/l55/", catalog_page(&[1], 3), 2).await;
        Mock::given(method("GET"))
            .and(path("/l55/2/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_string("late"),
            )
            .mount(&server)
            .await;
        mount_page(&server, "/l55/3/", catalog_page(&[3], 3), 1).await;

        let cooldown = Duration::from_millis(300);
        let crawler = crawler(&server, 1, None, cooldown);
        let started = Instant::now();
        let sources: Vec<BookSource> = crawler.sources().await.unwrap().collect().await;

        assert_eq!(sources.len(), 2);
        assert!(started.elapsed() >= cooldown);
    }

    #[tokio::test]
    async fn test_unavailable_start_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/l55/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let crawler = crawler(&server, 1, None, Duration::ZERO);
        assert!(matches!(
            crawler.sources().await,
            Err(CrawlError::StartPage { .. })
        ));
    }

    #[test]
    fn test_max_page_defaults_to_one() {
        let server_less = CategoryCrawler::new(
            PageFetcher::new(&NetworkConfig::default()).unwrap(),
            Console::with_colors(false),
            Url::parse("https://tululu.org/l55/").unwrap(),
            1,
            None,
            Duration::ZERO,
        );
        assert_eq!(server_less.extract_max_page("<p>no pager</p>"), 1);
        assert_eq!(server_less.extract_max_page(&catalog_page(&[], 701)), 701);
    }
}
