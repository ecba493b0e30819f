//! HTTP layer: status mapping, OTP detection, retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::error::{RegistryError, RegistryResult};
use crate::types::{DownloadsResponse, RegistryConfig};

use super::helpers::{extract_error_message, parse_body, requires_otp};

const OTP_HEADER: &str = "npm-otp";

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestOptions {
    pub body: Option<Value>,
    pub otp: Option<String>,
    pub query: Vec<(&'static str, String)>,
}

impl RequestOptions {
    pub(crate) fn json(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    pub(crate) fn query(pairs: Vec<(&'static str, String)>) -> Self {
        Self {
            query: pairs,
            ..Self::default()
        }
    }

    pub(crate) fn with_otp(mut self, otp: Option<&str>) -> Self {
        self.otp = otp.map(String::from);
        self
    }
}

/// HTTP backend for making requests (holds reqwest client, auth, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token_provider: TokenProvider,
    pub(crate) config: RegistryConfig,
}

impl HttpBackend {
    /// Issue a request against the registry, retrying transient failures.
    ///
    /// Every response counts against `max_attempts`, including 429s. A
    /// rate-limit response waits for `Retry-After` when present, otherwise for
    /// the linear backoff `retry_base_ms * attempt`. OTP challenges and other
    /// 4xx responses return immediately.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
    ) -> RegistryResult<Value> {
        let url = self.url(path);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            debug!(method = %method, url = %url, attempt, max_attempts, "registry request");

            match self.request_once(method.clone(), &url, options).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    if attempt < max_attempts {
                        let delay = match &e {
                            RegistryError::RateLimited {
                                retry_after: Some(retry_after),
                            } => *retry_after,
                            _ => self.backoff(attempt),
                        };

                        warn!(
                            error = %e,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "retrying request"
                        );

                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
                Err(RegistryError::OtpRequired) => {
                    debug!(url = %url, "registry requested a one-time password");
                    return Err(RegistryError::OtpRequired);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| RegistryError::Network {
            message: "request failed after retries".to_string(),
        }))
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> RegistryResult<Value> {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(token) = self.token_provider.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(otp) = &options.otp {
            request = request.header(OTP_HEADER, otp.as_str());
        }

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }

        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let text = response.text().await.map_err(|e| RegistryError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        let body = parse_body(&text);

        match status {
            200..=299 => Ok(body),

            401 | 403 => {
                if requires_otp(&headers, &body) {
                    return Err(RegistryError::OtpRequired);
                }
                Err(RegistryError::Unauthorized {
                    status,
                    message: extract_error_message(status, &body),
                })
            }

            429 => {
                let retry_after = headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(RegistryError::RateLimited { retry_after })
            }

            _ => Err(RegistryError::Http {
                status,
                message: extract_error_message(status, &body),
                body: text,
            }),
        }
    }

    /// Weekly downloads from the downloads API; any failure means unknown.
    pub(crate) async fn fetch_downloads(&self, url: &str) -> Option<u64> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "downloads lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url = %url, status = response.status().as_u16(), "downloads lookup failed");
            return None;
        }

        match response.json::<DownloadsResponse>().await {
            Ok(data) => Some(data.downloads),
            Err(e) => {
                debug!(url = %url, error = %e, "invalid downloads response");
                None
            }
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_base_ms.saturating_mul(u64::from(attempt)))
    }
}
