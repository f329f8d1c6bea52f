//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made against the listing source:
//! - Building the shared HTTP client with a browser-like identity
//! - GET requests with retry and exponential backoff on transient failures
//! - Listing fetches that insist on an HTML body
//! - HEAD probes that report a link's Content-Type
//! - Error classification (transient vs permanent)

use crate::config::HttpConfig;
use crate::crawler::gate::RequestGate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// Why a request did not produce a usable response
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Timeouts, connection failures, 429 and 5xx, after retries ran out
    #[error("transient failure for {url}: {reason}")]
    Transient { url: String, reason: String },

    /// Any other 4xx, a non-HTML listing, or an unreadable body
    #[error("permanent failure for {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    fn transient(url: &Url, reason: impl Into<String>) -> Self {
        Self::Transient {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    fn permanent(url: &Url, reason: impl Into<String>) -> Self {
        Self::Permanent {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Retry settings for one class of requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Delay before retry `n` is `backoff_factor * 2^(n-1)` seconds
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
        }
    }

    /// Delay before the given retry (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        let seconds = self.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }
}

/// Successful GET response
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// URL after redirects; relative links resolve against this
    pub final_url: Url,

    /// Content-Type header value, if present
    pub content_type: Option<String>,

    pub body: Vec<u8>,
}

/// A fetched and decoded directory listing
#[derive(Debug, Clone)]
pub struct Listing {
    pub final_url: Url,
    pub html: String,
}

/// Builds an HTTP client with the configured identity
///
/// The listing server rejects default client identifiers, so every request
/// carries a browser User-Agent plus the `Accept` headers a browser sends.
///
/// # Arguments
///
/// * `config` - The `[http]` configuration section
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues requests against the listing source through a request gate
///
/// Cloning is cheap; clones share the client and the gate.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    gate: Arc<RequestGate>,
    policy: RetryPolicy,
    deadline: Option<Instant>,
}

impl Fetcher {
    pub fn new(client: Client, gate: Arc<RequestGate>, policy: RetryPolicy) -> Self {
        Self {
            client,
            gate,
            policy,
            deadline: None,
        }
    }

    /// Stops retrying once a backoff sleep would end past `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// GETs `url`, retrying transient failures with exponential backoff
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | HTTP 429, 5xx | Retry, then `Transient` |
    /// | Timeout, connection error | Retry, then `Transient` |
    /// | Any other status | Immediate `Permanent` |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `timeout` - Per-attempt timeout, overriding the client default
    pub async fn fetch_with_retry(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<FetchedBody, FetchError> {
        let mut retry = 0;

        loop {
            let error = match self.get_once(url, timeout).await {
                Ok(fetched) => return Ok(fetched),
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => error,
            };

            if retry >= self.policy.max_retries {
                return Err(error);
            }
            retry += 1;

            let delay = self.policy.backoff(retry);
            if let Some(deadline) = self.deadline {
                if Instant::now() + delay >= deadline {
                    tracing::warn!("Not retrying {}: execution budget exhausted", url);
                    return Err(error);
                }
            }

            tracing::debug!(
                "Retry {}/{} for {} in {:?} ({})",
                retry,
                self.policy.max_retries,
                url,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetches a directory listing and decodes it as text
    ///
    /// A listing response must be HTML; a missing Content-Type is tolerated.
    pub async fn fetch_listing(&self, url: &Url, timeout: Duration) -> Result<Listing, FetchError> {
        let fetched = self.fetch_with_retry(url, timeout).await?;

        if let Some(content_type) = &fetched.content_type {
            if !is_html(content_type) {
                return Err(FetchError::permanent(
                    url,
                    format!("listing is not HTML ({})", content_type),
                ));
            }
        }

        Ok(Listing {
            final_url: fetched.final_url,
            html: String::from_utf8_lossy(&fetched.body).into_owned(),
        })
    }

    /// Sends a HEAD request and returns the Content-Type, if any
    ///
    /// HEAD probes are not retried; a failed probe leaves the caller's
    /// heuristic in place.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(String))` - Content-Type header value
    /// * `Ok(None)` - No Content-Type header
    /// * `Err(FetchError)` - The request failed or returned an error status
    pub async fn probe_content_type(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Option<String>, FetchError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .ok_or_else(|| FetchError::transient(url, "request gate closed"))?;

        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let response = check_status(url, response)?;
        Ok(content_type_of(&response))
    }

    async fn get_once(&self, url: &Url, timeout: Duration) -> Result<FetchedBody, FetchError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .ok_or_else(|| FetchError::transient(url, "request gate closed"))?;

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let response = check_status(url, response)?;
        let final_url = response.url().clone();
        let content_type = content_type_of(&response);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        Ok(FetchedBody {
            final_url,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Returns true if a Content-Type names an HTML document
pub fn is_html(content_type: &str) -> bool {
    content_type.to_lowercase().contains("html")
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn check_status(url: &Url, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if is_retryable_status(status) {
        Err(FetchError::transient(url, format!("HTTP {}", status)))
    } else {
        Err(FetchError::permanent(url, format!("HTTP {}", status)))
    }
}

/// 429 and every 5xx are worth retrying
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn classify_reqwest_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::transient(url, "request timeout")
    } else if error.is_connect() {
        FetchError::transient(url, "connection failed")
    } else if error.is_body() || error.is_request() {
        FetchError::transient(url, error.to_string())
    } else {
        FetchError::permanent(url, error.to_string())
    }
}
