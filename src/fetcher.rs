//! Single-request HTTP fetching with outcome classification.
//!
//! The catalog site never answers "no such book" with an error status;
//! it quietly redirects to another page. Any followed redirect is
//! therefore reported as not-found, alongside real error statuses.

use crate::config::NetworkConfig;
use crate::error::FetchError;
use url::Url;

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Document {
    pub html: String,
    /// URL the response actually came from. Relative links resolve
    /// against this, not against the requested URL.
    pub final_url: Url,
}

/// Result of fetching one page.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Document(Document),
    NotFound(String),
    TransientFailure(String),
}

impl From<Result<Document, FetchError>> for FetchOutcome {
    fn from(result: Result<Document, FetchError>) -> Self {
        match result {
            Ok(doc) => FetchOutcome::Document(doc),
            Err(FetchError::NotFound(reason)) => FetchOutcome::NotFound(reason),
            Err(FetchError::Transient(reason)) => FetchOutcome::TransientFailure(reason),
        }
    }
}

/// Raw response body plus the URL it was served from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub final_url: Url,
}

/// Issues GET requests and classifies what came back. Never retries.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    debug: bool,
}

impl PageFetcher {
    /// Creates a fetcher with the configured timeout and user agent.
    pub fn new(config: &NetworkConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            debug: config.debug,
        })
    }

    /// Fetches an HTML page.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let result = match self.send(url).await {
            Ok(response) => {
                let final_url = response.url().clone();
                response
                    .text()
                    .await
                    .map(|html| Document { html, final_url })
                    .map_err(|e| self.transient(url, e))
            }
            Err(err) => Err(err),
        };
        result.into()
    }

    /// Fetches a raw body, for text and image downloads.
    pub async fn fetch_bytes(&self, url: &Url) -> Result<Fetched, FetchError> {
        let response = self.send(url).await?;
        let final_url = response.url().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transient(url, e))?;

        Ok(Fetched {
            bytes: bytes.to_vec(),
            final_url,
        })
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transient(url, e))?;

        let status = response.status();
        if self.debug {
            eprintln!(
                "[Fetch Debug] GET {} -> {} ({})",
                url,
                status.as_u16(),
                response.url()
            );
        }

        if !status.is_success() {
            return Err(FetchError::NotFound(format!("{} returned HTTP {}", url, status)));
        }

        if response.url() != url {
            return Err(FetchError::NotFound(format!(
                "{} redirected to {}",
                url,
                response.url()
            )));
        }

        Ok(response)
    }

    fn transient(&self, url: &Url, err: reqwest::Error) -> FetchError {
        if self.debug {
            eprintln!("[Fetch Debug] GET {} failed: {:?}", url, err);
        }
        let kind = if err.is_timeout() {
            "timed out"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        FetchError::Transient(format!("{} {}: {}", url, kind, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout_sec: f64) -> PageFetcher {
        PageFetcher::new(&NetworkConfig {
            request_timeout_sec: timeout_sec,
            ..NetworkConfig::default()
        })
        .unwrap()
    }

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), path)).unwrap()
    }

    #[tokio::test]
    async fn test_document_keeps_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b1/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<h1>Книга</h1>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let requested = url(&server, "/b1/");
        match fetcher(5.0).fetch(&requested).await {
            FetchOutcome::Document(doc) => {
                assert_eq!(doc.html, "<h1>Книга</h1>");
                assert_eq!(doc.final_url, requested);
            }
            other => panic!("expected document, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/b2/"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", format!("{}/", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("front page"))
            .mount(&server)
            .await;

        let outcome = fetcher(5.0).fetch(&url(&server, "/b2/")).await;
        assert!(matches!(outcome, FetchOutcome::NotFound(_)), "{:?}", outcome);

        let err = fetcher(5.0)
            .fetch_bytes(&url(&server, "/b2/"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let outcome = fetcher(5.0).fetch(&url(&server, "/missing")).await;
        assert!(matches!(outcome, FetchOutcome::NotFound(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_string("late"),
            )
            .mount(&server)
            .await;

        let outcome = fetcher(0.05).fetch(&url(&server, "/slow")).await;
        assert!(matches!(outcome, FetchOutcome::TransientFailure(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dead = Url::parse(&format!("http://127.0.0.1:{}/b3/", port)).unwrap();
        let err = fetcher(2.0).fetch_bytes(&dead).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_raw_body() {
        let server = MockServer::start().await;
        let png: &[u8] = &[137, 80, 78, 71, 13, 10, 26, 10];
        Mock::given(method("GET"))
            .and(path("/shots/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png))
            .mount(&server)
            .await;

        let fetched = fetcher(5.0)
            .fetch_bytes(&url(&server, "/shots/1.png"))
            .await
            .unwrap();
        assert_eq!(fetched.bytes, png);
    }
}
