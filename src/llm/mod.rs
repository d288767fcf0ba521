//! Outbound calls to the generative model.
//!
//! A [`CompletionBackend`] performs exactly one attempt; [`RetryingClient`]
//! layers the retry/backoff policy on top and converts the final failure
//! into a [`crate::error::PlanError`].

use std::{fmt, time::Duration};

use async_trait::async_trait;

mod gemini;
mod retry;

pub use gemini::GeminiBackend;
pub use retry::{RetryPolicy, RetryingClient};
#[cfg(test)]
pub(crate) use retry::testing;

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// Connection or I/O error before a response arrived.
    Transport,
    Timeout,
    /// 5xx response.
    Server(u16),
    RateLimited { retry_after: Option<Duration> },
    /// 401/403: bad or missing credential.
    Auth(u16),
    /// Any other 4xx.
    Rejected(u16),
    /// 2xx without usable text.
    Malformed,
}

impl UpstreamFailure {
    pub fn is_retriable(&self) -> bool {
        match self {
            UpstreamFailure::Transport
            | UpstreamFailure::Timeout
            | UpstreamFailure::Server(_)
            | UpstreamFailure::RateLimited { .. }
            | UpstreamFailure::Malformed => true,
            UpstreamFailure::Auth(_) | UpstreamFailure::Rejected(_) => false,
        }
    }

    pub fn from_status(status: u16, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => UpstreamFailure::Auth(status),
            429 => UpstreamFailure::RateLimited { retry_after },
            500..=599 => UpstreamFailure::Server(status),
            _ => UpstreamFailure::Rejected(status),
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Transport => f.write_str("transport error"),
            UpstreamFailure::Timeout => f.write_str("timeout"),
            UpstreamFailure::Server(s) => write!(f, "server error ({s})"),
            UpstreamFailure::RateLimited { .. } => f.write_str("rate limited (429)"),
            UpstreamFailure::Auth(s) => write!(f, "authentication failure ({s})"),
            UpstreamFailure::Rejected(s) => write!(f, "request rejected ({s})"),
            UpstreamFailure::Malformed => f.write_str("malformed response"),
        }
    }
}

/// One prompt in, raw text out. Implementations must not retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamFailure>;
}
