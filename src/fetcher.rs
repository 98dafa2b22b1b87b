use std::time::Duration;

use anyhow::{Context, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;

const BASE_BACKOFF_MS: u64 = 2000;

/// Page source. Failures come back as values; callers decide what they cost.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    /// Zero or less disables rate limiting.
    pub requests_per_second: f64,
    pub timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

/// reqwest client with a shared rate limit and retry on 429/5xx.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
    limiter: Option<DefaultDirectRateLimiter>,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)
                .with_context(|| format!("Invalid base URL: {}", config.base_url))?,
            limiter: rate_limiter(config.requests_per_second),
            max_retries: config.max_retries,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let resolved = if url.starts_with("http://") || url.starts_with("https://") {
            Url::parse(url)
        } else {
            self.base_url.join(url)
        };
        resolved.map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let target = self.resolve(url)?;
        let mut attempt = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            match self.fetch_once(&target).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", target, body.len());
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = backoff_for(attempt);
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt + 1,
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn rate_limiter(requests_per_second: f64) -> Option<DefaultDirectRateLimiter> {
    if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
        return None;
    }
    let period = Duration::try_from_secs_f64(1.0 / requests_per_second).ok()?;
    let quota = Quota::with_period(period)?;
    Some(RateLimiter::direct(quota))
}

fn backoff_for(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt)))
}

fn classify(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if e.is_connect() {
        FetchError::Connect(url.to_string())
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: e,
        }
    }
}
