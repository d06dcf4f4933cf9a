use crate::fetcher::{client::Transport, errors::FetchError, types::PageResponse};
use rand::Rng;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};
use url::Url;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
    /// Fraction of `delay` randomly added or removed, in `[0, 1)`. Zero keeps the delay exact.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: 0.0,
        }
    }

    /// Spread each delay by up to `jitter` of itself. Values outside
    /// `0.0..0.99` are clamped; NaN and infinities disable jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = sanitize_jitter(jitter);
        self
    }

    /// Delay to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        // the field may be set without going through with_jitter
        let jitter = sanitize_jitter(self.jitter);
        if jitter == 0.0 || self.delay.is_zero() {
            return self.delay;
        }

        let factor = rand::thread_rng().gen_range((1.0 - jitter)..(1.0 + jitter));
        self.delay.mul_f64(factor)
    }
}

fn sanitize_jitter(jitter: f64) -> f64 {
    if jitter.is_finite() {
        jitter.clamp(0.0, 0.99)
    } else {
        0.0
    }
}

/// Retrieves pages with bounded retries.
///
/// Cheap to clone: every clone shares the same transport (and so the same
/// connection pool).
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// 404 and rejected requests fail after the first attempt. When every
    /// attempt fails the error of the last attempt is returned unchanged.
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    pub async fn fetch(&self, url: &str) -> Result<PageResponse, FetchError> {
        let url = Url::parse(url)?;
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.transport.get(&url).await {
                Ok(page) => {
                    debug!(attempt, "fetched");
                    return Ok(page);
                }
                Err(err) => err,
            };

            if !err.should_retry() {
                debug!(attempt, error = %err, "not retrying");
                return Err(err);
            }
            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %err, "giving up");
                return Err(err);
            }

            let delay = self.policy.delay();
            debug!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
