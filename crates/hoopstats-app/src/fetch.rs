// Page fetching: season stats page URL -> markup.

use async_trait::async_trait;
use hoopstats_core::StatCategory;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::SourceConfig;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// URL of one season's table for `category`.
pub fn page_url(base_url: &str, year: i32, category: StatCategory) -> String {
    format!(
        "{}/NBA_{}_{}.html",
        base_url.trim_end_matches('/'),
        year,
        category.source_id()
    )
}

/// Anything that can hand out page markup for a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Live source backed by `reqwest`, with the configured timeout applied to
/// every request.
pub struct HttpPageSource {
    http: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching page");
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
