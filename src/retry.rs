use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::core::{Completion, CompletionRequest, Error, Result, ports::CompletionClient};

/// Exponential backoff without jitter.
///
/// The wait after the `n`th failed attempt is `multiplier * 2^(n-1)` seconds,
/// clamped to `[min_delay, max_delay]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 9999,
            multiplier: 1.0,
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.multiplier * 2f64.powi(exponent);
        let secs = raw
            .max(self.min_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Wraps a [`CompletionClient`] and retries every failure per its [`BackoffPolicy`].
#[derive(Clone)]
pub struct ResilientCaller {
    client: Arc<dyn CompletionClient>,
    policy: BackoffPolicy,
}

impl ResilientCaller {
    pub fn new(client: Arc<dyn CompletionClient>, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn call(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut attempt: u32 = 1;
        loop {
            match self.client.complete(request).await {
                Ok(completion) => {
                    if attempt > 1 {
                        debug!(attempt, "Completion succeeded after retrying");
                    }
                    return Ok(completion);
                }
                Err(err) if attempt >= self.policy.max_attempts => {
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "Completion attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
