use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use super::{CompletionBackend, UpstreamFailure};
use crate::error::PlanError;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on each further failure.
    pub initial_backoff: Duration,
    /// Used for 429 responses that carry no retry hint.
    pub rate_limit_delay: Duration,
    /// Longest single wait. A 429 asking for more gives up instead.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt number `attempt`
    /// (1-based). `None` when the upstream asks for a wait beyond `max_delay`.
    pub fn delay_for(&self, attempt: u32, failure: &UpstreamFailure) -> Option<Duration> {
        let backoff = self
            .initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        match failure {
            UpstreamFailure::RateLimited {
                retry_after: Some(hint),
            } if *hint > self.max_delay => None,
            UpstreamFailure::RateLimited { retry_after } => Some(
                retry_after
                    .unwrap_or(self.rate_limit_delay)
                    .max(backoff)
                    .min(self.max_delay),
            ),
            _ => Some(backoff),
        }
    }
}

fn terminal(failure: &UpstreamFailure) -> PlanError {
    match failure {
        UpstreamFailure::Auth(_) => PlanError::UpstreamAuthFailure,
        UpstreamFailure::RateLimited { .. } => PlanError::UpstreamRateLimited,
        UpstreamFailure::Transport
        | UpstreamFailure::Timeout
        | UpstreamFailure::Server(_)
        | UpstreamFailure::Rejected(_)
        | UpstreamFailure::Malformed => PlanError::UpstreamUnavailable,
    }
}

#[derive(Clone)]
pub struct RetryingClient {
    backend: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.backend.complete(prompt).await {
                Ok(text) => {
                    debug!(attempt, "upstream completion received");
                    return Ok(text);
                }
                Err(f) => f,
            };

            if !failure.is_retriable() {
                error!(attempt, %failure, "upstream failure is not retriable");
                return Err(terminal(&failure));
            }
            if attempt >= max {
                error!(attempt, max, %failure, "upstream retries exhausted");
                return Err(terminal(&failure));
            }

            let Some(delay) = self.policy.delay_for(attempt, &failure) else {
                error!(attempt, %failure, "upstream retry hint exceeds the maximum wait");
                return Err(terminal(&failure));
            };
            warn!(
                attempt,
                max,
                %failure,
                delay_ms = delay.as_millis() as u64,
                "upstream attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
