use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::Settings;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Timeouts, connection failures, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
        }
    }
}

/// Source of page markup. The HTTP implementation is swapped for an
/// in-memory one in tests.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(map_reqwest)
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_backoff: Duration::from_millis(settings.base_backoff_ms),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }
}

/// Fetch `url`, retrying transient failures with exponential backoff.
pub async fn fetch_with_retry<F: Fetch + ?Sized>(
    fetcher: &F,
    url: &str,
    policy: RetryPolicy,
) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
        match fetcher.get(url).await {
            Ok(body) => {
                debug!("Fetched {} ({} bytes)", url, body.len());
                return Ok(body);
            }
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "Fetch failed for {} ({}, attempt {}/{}), backing off {:.1}s",
                    url,
                    e,
                    attempt + 1,
                    policy.max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Opens after `threshold` consecutive transient failures; any answer from the
/// source, a 404 included, closes it again.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.consecutive_failures >= self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, err: &FetchError) {
        if err.is_transient() {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeFetcher;
    use super::*;

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Status(429).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(FetchError::Transport("reset".into()).is_transient());
    }

    #[tokio::test]
    async fn retries_until_success() {
        let fetcher = FakeFetcher::new()
            .with_page("u", "<html></html>")
            .with_failures("u", vec![FetchError::Timeout, FetchError::Status(502)]);

        let body = fetch_with_retry(&fetcher, "u", no_wait(3)).await.unwrap();
        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let fetcher = FakeFetcher::new()
            .with_page("u", "ok")
            .with_failures("u", vec![FetchError::Timeout; 5]);

        let err = fetch_with_retry(&fetcher, "u", no_wait(2)).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout);
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let fetcher = FakeFetcher::new();
        let err = fetch_with_retry(&fetcher, "missing", no_wait(3)).await.unwrap_err();
        assert_eq!(err, FetchError::Status(404));
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[test]
    fn breaker_opens_and_resets() {
        let mut b = CircuitBreaker::new(2);
        b.record_failure(&FetchError::Timeout);
        assert!(!b.is_open());
        b.record_success();
        b.record_failure(&FetchError::Timeout);
        b.record_failure(&FetchError::Status(503));
        assert!(b.is_open());
    }

    #[test]
    fn not_found_does_not_trip_breaker() {
        let mut b = CircuitBreaker::new(2);
        for _ in 0..5 {
            b.record_failure(&FetchError::Status(404));
        }
        assert!(!b.is_open());

        b.record_failure(&FetchError::Timeout);
        b.record_failure(&FetchError::Status(404));
        b.record_failure(&FetchError::Timeout);
        assert!(!b.is_open());
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
        };
        assert_eq!(p.backoff(0), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(400));
    }
}
