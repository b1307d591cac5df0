use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use scraper::Html;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::config::ScrapeConfig;
use crate::errors::{Result, ScrapeError};

/// Raw body of a fetched page. Parsing is left to the caller since `Html` is not `Send`.
#[derive(Debug, Clone)]
pub struct Page {
    pub text: String,
}

impl Page {
    pub fn document(&self) -> Html {
        Html::parse_document(&self.text)
    }
}

/// One GET per call, no retries. Failures surface as recoverable [`ScrapeError`]s.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(REFERER, header_value(&config.base_url)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ScrapeError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_error(&self, url: &str, e: reqwest::Error) -> ScrapeError {
        if e.is_timeout() {
            ScrapeError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            ScrapeError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ScrapeError::Config(format!("header value {:?}: {}", value, e)))
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(|e| self.map_error(url, e))?;
        Ok(Page { text })
    }
}

/// In-memory fetcher keyed by exact URL. Unknown URLs answer 404.
/// Records every request so callers can assert on crawl order.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        match self.pages.get(url) {
            Some(body) => Ok(Page { text: body.clone() }),
            None => Err(ScrapeError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_fetcher_serves_and_records() {
        let fetcher = StaticFetcher::new().with_page("https://roxiestreams.live/", "<html></html>");

        let page = fetcher.fetch("https://roxiestreams.live/").await.unwrap();
        assert_eq!(page.text, "<html></html>");

        let err = fetcher.fetch("https://roxiestreams.live/nope").await.unwrap_err();
        assert!(matches!(err, ScrapeError::HttpStatus { status: 404, .. }));

        assert_eq!(
            fetcher.requests(),
            vec![
                "https://roxiestreams.live/".to_string(),
                "https://roxiestreams.live/nope".to_string()
            ]
        );
    }

    #[test]
    fn rejects_header_with_newline() {
        let config = ScrapeConfig {
            user_agent: "bad\nagent".to_string(),
            ..Default::default()
        };
        assert!(matches!(HttpFetcher::new(&config), Err(ScrapeError::Config(_))));
    }
}
