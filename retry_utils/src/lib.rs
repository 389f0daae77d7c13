use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How a failed collaborator call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Source asked us to slow down
    RateLimit,
    /// Source did not answer in time
    Timeout,
    /// Retrying will not help
    Permanent,
}

/// Delay schedule for repeating failed fetches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before retry `n` after a rate limit, in milliseconds
    pub rate_limit_delays_ms: Vec<u64>,
    /// Delay before retry `n` after a timeout, in milliseconds
    pub timeout_delays_ms: Vec<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            rate_limit_delays_ms: vec![500, 1000],
            timeout_delays_ms: vec![250, 500],
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up on the first failure
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            rate_limit_delays_ms: Vec::new(),
            timeout_delays_ms: Vec::new(),
        }
    }

    fn delay_for(&self, retry: u32, kind: FailureKind) -> Option<Duration> {
        let delays = match kind {
            FailureKind::RateLimit => &self.rate_limit_delays_ms,
            FailureKind::Timeout => &self.timeout_delays_ms,
            FailureKind::Permanent => return None,
        };
        delays.get(retry as usize).map(|&ms| Duration::from_millis(ms))
    }
}

/// Result of a retried call together with how many attempts it took
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or the policy runs
/// out of retries. The last error is returned unchanged.
pub async fn retry_fetch<F, Fut, T, E>(
    mut operation: F,
    policy: &RetryPolicy,
    classify: impl Fn(&E) -> FailureKind,
) -> Attempted<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!("✅ Fetch succeeded after {} retries", retry);
                }
                return Attempted { result: Ok(value), attempts: retry + 1 };
            }
            Err(error) => error,
        };

        let kind = classify(&error);
        let delay = if retry < policy.max_retries {
            policy.delay_for(retry, kind)
        } else {
            None
        };

        let Some(delay) = delay else {
            debug!("Giving up after {} attempts ({:?}): {}", retry + 1, kind, error);
            return Attempted { result: Err(error), attempts: retry + 1 };
        };

        warn!(
            "⚠️  Fetch failed (attempt {}/{}): {} - retrying in {}ms ({:?})",
            retry + 1,
            policy.max_retries + 1,
            error,
            delay.as_millis(),
            kind
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
