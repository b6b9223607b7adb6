// =============================================================================
// fetcher.rs - POLITE, PERSISTENT PAGE FETCHING
// =============================================================================
//
// Every page the watcher reads goes through here. The rules:
//
// 1. Always present the same desktop browser User-Agent. The site turns away
//    obvious bots.
// 2. Transport failures (connect, DNS, timeout, truncated body) are retried
//    up to `retries` attempts total, with a fixed `retry_delay` in between.
// 3. A non-2xx answer is the server telling us no. That is final.
// 4. After every attempt, whatever its outcome, sleep a random 1-5 seconds
//    so the requests never arrive in a burst.
// 5. Every request has a timeout. A hung socket must not hang the job.
// =============================================================================

use std::time::Duration;

use portable_atomic::{AtomicU64, Ordering};
use rand::Rng;
use reqwest::StatusCode;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::FetchError;

/// The browser string every request is sent with.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0";

/// How much of a rejected response body makes it into the log.
const REJECTED_BODY_LOG_LIMIT: usize = 512;

/// Counters for everything the fetcher has done this run.
#[derive(Default)]
pub struct FetchStats {
    pub attempts: AtomicU64,
    pub retries: AtomicU64,
    pub transport_failures: AtomicU64,
    pub rejections: AtomicU64,
    pub pages_fetched: AtomicU64,
}

/// A serializable snapshot of [`FetchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FetchSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub transport_failures: u64,
    pub rejections: u64,
    pub pages_fetched: u64,
}

/// What went wrong with one attempt.
enum AttemptFailure {
    Transport(reqwest::Error),
    Rejected(StatusCode),
}

/// HTTP GET with retry, backoff and courtesy jitter.
pub struct Fetcher {
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
    courtesy_delay_min: Duration,
    courtesy_delay_max: Duration,
    stats: FetchStats,
}

impl Fetcher {
    /// Build a fetcher from the run configuration.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            retries: config.retries.max(1),
            retry_delay: config.retry_delay,
            courtesy_delay_min: config.courtesy_delay_min,
            courtesy_delay_max: config.courtesy_delay_max,
            stats: FetchStats::default(),
        })
    }

    /// Fetch `url` and parse it as an HTML document.
    pub async fn fetch(&self, url: &str) -> Result<Html, FetchError> {
        let body = self.fetch_text(url).await?;
        Ok(Html::parse_document(&body))
    }

    /// Fetch `url` and return the raw body text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);
            info!(url = %url, attempt, max_attempts = self.retries, "Requesting page");

            let outcome = self.attempt(url).await;
            self.courtesy_pause().await;

            match outcome {
                Ok(body) => {
                    self.stats.pages_fetched.fetch_add(1, Ordering::Relaxed);
                    return Ok(body);
                }
                Err(AttemptFailure::Rejected(status)) => {
                    self.stats.rejections.fetch_add(1, Ordering::Relaxed);
                    return Err(FetchError::Rejected {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(AttemptFailure::Transport(source)) => {
                    self.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts = self.retries,
                        error = %source,
                        "Request failed"
                    );

                    if attempt >= self.retries {
                        warn!(url = %url, attempts = attempt, "Max retries reached, giving up");
                        return Err(FetchError::Transport {
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }

                    self.stats.retries.fetch_add(1, Ordering::Relaxed);
                    info!(
                        url = %url,
                        wait_secs = self.retry_delay.as_secs(),
                        "Waiting before retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// One GET, classified.
    async fn attempt(&self, url: &str) -> Result<String, AttemptFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AttemptFailure::Transport)?;

        let status = response.status();
        info!(url = %url, status = status.as_u16(), "Response received");

        if !status.is_success() {
            // The body is only for the log; a failure to read it changes nothing.
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                body = %truncate(&body, REJECTED_BODY_LOG_LIMIT),
                "Server rejected the request"
            );
            return Err(AttemptFailure::Rejected(status));
        }

        response.text().await.map_err(AttemptFailure::Transport)
    }

    async fn courtesy_pause(&self) {
        let pause = self.courtesy_delay();
        if pause.is_zero() {
            return;
        }
        debug!(pause_ms = pause.as_millis() as u64, "Courtesy pause");
        tokio::time::sleep(pause).await;
    }

    /// A random pause inside the configured bounds.
    fn courtesy_delay(&self) -> Duration {
        let min = millis(self.courtesy_delay_min);
        let max = millis(self.courtesy_delay_max).max(min);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    pub fn stats(&self) -> FetchSnapshot {
        FetchSnapshot {
            attempts: self.stats.attempts.load(Ordering::Relaxed),
            retries: self.stats.retries.load(Ordering::Relaxed),
            transport_failures: self.stats.transport_failures.load(Ordering::Relaxed),
            rejections: self.stats.rejections.load(Ordering::Relaxed),
            pages_fetched: self.stats.pages_fetched.load(Ordering::Relaxed),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
