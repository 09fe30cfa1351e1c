//! Outbound GET execution with rate limiting and retry.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::rate_limiter::RateLimiter;
use crate::core::config::UpstreamConfig;

/// Issues GET requests against the upstream base URL.
///
/// Server errors (5xx) and network faults are retried with exponential
/// backoff (`base * 2^attempt`) up to `max_retries` times. Client errors and
/// malformed bodies fail on first occurrence.
#[derive(Debug)]
pub struct HttpExecutor {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpExecutor {
    /// Build the executor and its pooled HTTP client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::new(config.max_requests, config.window()),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `params` and parse the body as JSON.
    pub async fn execute(&self, path: &str, params: &[(&str, String)]) -> ApiResult<Value> {
        let url = self.url_for(path, params)?;
        let mut attempt: u32 = 0;

        loop {
            self.limiter.acquire().await;
            debug!("GET {} (attempt {})", url, attempt + 1);

            let response = match self.http.get(&url).send().await {
                Ok(response) => response,
                Err(e) if attempt < self.max_retries => {
                    self.backoff(attempt, &e.to_string()).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    return Err(ApiError::UpstreamRequestFailed {
                        message: format!("Request failed: {e}"),
                        status_code: None,
                        details: Some(json!({ "url": url, "attempts": attempt + 1 })),
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    ApiError::upstream(
                        format!("Failed to read response body: {e}"),
                        Some(status.as_u16()),
                    )
                })?;
                return serde_json::from_str(&body)
                    .map_err(|e| ApiError::InvalidResponse(e.to_string()));
            }

            if status.is_server_error() && attempt < self.max_retries {
                self.backoff(attempt, &format!("HTTP {}", status.as_u16())).await;
                attempt += 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UpstreamRequestFailed {
                message: format!("HTTP {}: {}", status.as_u16(), body),
                status_code: Some(status.as_u16()),
                details: Some(json!({ "url": url, "body": body, "attempts": attempt + 1 })),
            });
        }
    }

    fn url_for(&self, path: &str, params: &[(&str, String)]) -> ApiResult<String> {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if !params.is_empty() {
            let query = serde_urlencoded::to_string(params)
                .map_err(|e| ApiError::invalid_filter(format!("Unencodable query: {e}")))?;
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    /// Wait before retry `attempt + 1`: `base * 2^attempt`.
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    async fn backoff(&self, attempt: u32, reason: &str) {
        let delay = self.retry_delay(attempt);
        warn!(
            "Upstream request failed ({}), retrying in {:?} (attempt {}/{})",
            reason,
            delay,
            attempt + 1,
            self.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}
