use crate::types::{AggregatorError, FetchConfig, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_yaml::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Seam between the aggregator and the network. A fetch either yields a
/// parsed subscription document or nothing; failures never propagate past
/// this boundary.
#[async_trait]
pub trait FetchSubscription: Send + Sync {
    async fn fetch_document(&self, url: &str) -> Option<Value>;
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(accept) = HeaderValue::from_str(&config.accept) {
            headers.insert(ACCEPT, accept);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch the subscription body, retrying transient failures.
    ///
    /// Connection-level errors and 500/502/503/504 are retried with
    /// exponential backoff up to `max_retries` additional attempts; any other
    /// non-2xx status fails immediately.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.retry_delay_ms),
            initial_interval: Duration::from_millis(self.config.retry_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_delay_ms * 32),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        debug!("Fetched {} ({})", url, status);
                        return Ok(response.text().await?);
                    }

                    if !is_retryable_status(status) {
                        return Err(AggregatorError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    last_error = Some(AggregatorError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(e) => {
                    last_error = Some(AggregatorError::Http(e));
                }
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or(AggregatorError::Status {
            url: url.to_string(),
            status: 0,
        }))
    }
}

#[async_trait]
impl FetchSubscription for Fetcher {
    async fn fetch_document(&self, url: &str) -> Option<Value> {
        let text = match self.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to fetch subscription from {}: {}", url, e);
                return None;
            }
        };

        match serde_yaml::from_str(&text) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Failed to parse subscription from {}: {}", url, e);
                None
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
    }
}
