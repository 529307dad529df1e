//! HTTP client for the news-wire API
//!
//! This module handles all wire requests, including:
//! - Building the HTTP client with a proper user agent string
//! - Paginated search over category/language/type/priority filters
//! - Per-item document fetches
//! - Retry logic for transient failures
//!
//! Every request passes through the [`RateLimiter`] first.

use crate::config::{RateLimitConfig, UserAgentConfig, WireConfig};
use crate::models::RawWireItem;
use crate::wire::rate_limiter::{Bucket, RateLimiter};
use crate::IngestError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Status block of the wire's JSON envelope
#[derive(Debug, Deserialize)]
struct EnvelopeStatus {
    success: bool,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// Payload block of a search response
#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    result: Vec<RawWireItem>,
}

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: EnvelopeStatus,
    #[serde(default)]
    data: Option<SearchData>,
}

/// Filters for one search page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub category: i64,
    pub language: i64,
    pub item_type: Option<i64>,
    pub priority: Option<i64>,
    pub offset: u32,
    pub limit: u32,
}

impl SearchQuery {
    /// Creates a query for one category/language page
    pub fn new(category: i64, language: i64, offset: u32, limit: u32) -> Self {
        Self {
            category,
            language,
            item_type: None,
            priority: None,
            offset,
            limit,
        }
    }

    fn form_fields(&self, limit: u32) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("filter_category", self.category.to_string()),
            ("filter_language", self.language.to_string()),
            ("offset", self.offset.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(item_type) = self.item_type {
            fields.push(("filter_type", item_type.to_string()));
        }
        if let Some(priority) = self.priority {
            fields.push(("filter_priority", priority.to_string()));
        }
        fields
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use newswire_ingest::config::UserAgentConfig;
/// use newswire_ingest::wire::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "NewswireIngest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "desk@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: Name/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited client for the wire's search and document endpoints
pub struct WireClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    document_format: String,
    limiter: RateLimiter,
    max_retries: u32,
    retry_delay: Duration,
}

impl WireClient {
    /// Creates a wire client
    ///
    /// # Returns
    ///
    /// * `Ok(WireClient)` - Client ready to issue requests
    /// * `Err(IngestError)` - The base URL or HTTP client could not be built
    pub fn new(
        wire: &WireConfig,
        user_agent: &UserAgentConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, IngestError> {
        let mut base_url = Url::parse(&wire.base_url).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", wire.base_url, e))
        })?;

        // Joining relative endpoints must not drop the last path segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: build_http_client(user_agent)?,
            base_url,
            username: wire.username.clone(),
            password: wire.password.clone(),
            document_format: wire.document_format.clone(),
            limiter: RateLimiter::new(rate_limit),
            max_retries: rate_limit.max_retries.max(1),
            retry_delay: Duration::from_millis(rate_limit.retry_delay_ms),
        })
    }

    /// The rate limiter guarding this client
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The document format requested when none is given
    pub fn document_format(&self) -> &str {
        &self.document_format
    }

    /// Fetches one page of items for a category and language
    ///
    /// `limit` is capped to the wire's per-request maximum.
    pub async fn fetch_batch(
        &self,
        category: i64,
        language: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<RawWireItem>, IngestError> {
        self.search(&SearchQuery::new(category, language, offset, limit))
            .await
    }

    /// Runs a search with retries
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Non-2xx status | Retry up to `max_retries` attempts |
    /// | Network error / timeout | Retry up to `max_retries` attempts |
    /// | Envelope `success=false` | Retry up to `max_retries` attempts |
    /// | Malformed JSON | Retry up to `max_retries` attempts |
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawWireItem>, IngestError> {
        let limit = self.limiter.clamp_limit(query.limit);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.search_once(query, limit).await {
                Ok(items) => {
                    tracing::debug!(
                        "Wire search category={} language={} offset={} returned {} items",
                        query.category,
                        query.language,
                        query.offset,
                        items.len()
                    );
                    return Ok(items);
                }
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        "Wire search attempt {}/{} failed: {}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetches the full markup of one item
    ///
    /// Uses the document bucket of the rate limiter, separate from search.
    pub async fn fetch_document(
        &self,
        wire_id: &str,
        format: Option<&str>,
    ) -> Result<String, IngestError> {
        let format = format.unwrap_or(self.document_format.as_str());
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.fetch_document_once(wire_id, format).await {
                Ok(markup) => return Ok(markup),
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(
                        "Document fetch for {} attempt {}/{} failed: {}",
                        wire_id,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn search_once(
        &self,
        query: &SearchQuery,
        limit: u32,
    ) -> Result<Vec<RawWireItem>, IngestError> {
        let url = self.endpoint("abone/search/")?;

        self.limiter.acquire(Bucket::Search).await;

        let response = self
            .client
            .post(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .form(&query.form_fields(limit))
            .send()
            .await
            .map_err(|e| transient(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::TransientFetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let envelope: SearchEnvelope = response.json().await.map_err(|e| transient(&url, &e))?;

        if !envelope.response.success {
            return Err(IngestError::TransientFetch {
                url: url.to_string(),
                message: format!(
                    "wire reported failure (status {}): {}",
                    envelope
                        .response
                        .status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    envelope.response.message.unwrap_or_default()
                ),
            });
        }

        Ok(envelope.data.map(|d| d.result).unwrap_or_default())
    }

    async fn fetch_document_once(&self, wire_id: &str, format: &str) -> Result<String, IngestError> {
        let url = self.endpoint(&format!("abone/document/{}/{}", wire_id, format))?;

        self.limiter.acquire(Bucket::Document).await;

        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| transient(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::TransientFetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| transient(&url, &e))
    }

    fn endpoint(&self, path: &str) -> Result<Url, IngestError> {
        self.base_url.join(path).map_err(|e| IngestError::TransientFetch {
            url: format!("{}{}", self.base_url, path),
            message: format!("invalid endpoint URL: {}", e),
        })
    }
}

/// Classifies a reqwest failure as a transient fetch error
fn transient(url: &Url, error: &reqwest::Error) -> IngestError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_decode() {
        format!("Malformed response: {}", error)
    } else {
        error.to_string()
    };

    IngestError::TransientFetch {
        url: url.to_string(),
        message,
    }
}
