//! In-process limiters for login attempts and plan generation.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::warn;

/// At most `limit` hits per key within each fixed `window`.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    entries: Arc<Mutex<HashMap<String, (Instant, u32)>>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Records a hit and reports whether it is within the limit.
    pub async fn check(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        // Drop stale windows so the map does not grow without bound.
        entries.retain(|_, (started, _)| now.duration_since(*started) < self.window);

        let entry = entries.entry(key.to_string()).or_insert((now, 0));
        if entry.1 >= self.limit {
            warn!(key, limit = self.limit, "rate limit exceeded");
            return false;
        }
        entry.1 += 1;
        true
    }
}

#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    pub max_failures: u32,
    pub window: Duration,
}

impl Default for LoginGuardConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct FailureEntry {
    failures: u32,
    first_failure: Instant,
}

/// Blocks an email/IP pair after repeated failed logins.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    config: LoginGuardConfig,
    entries: Arc<Mutex<HashMap<String, FailureEntry>>>,
}

impl LoginGuard {
    pub fn new(config: LoginGuardConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn key(email: &str, ip: &str) -> String {
        format!("{email}|{ip}")
    }

    pub async fn is_blocked(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            return false;
        };
        if entry.first_failure.elapsed() >= self.config.window {
            entries.remove(key);
            return false;
        }
        entry.failures >= self.config.max_failures
    }

    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let entry = entries.entry(key.to_string()).or_insert(FailureEntry {
            failures: 0,
            first_failure: now,
        });
        if now.duration_since(entry.first_failure) >= self.config.window {
            entry.failures = 0;
            entry.first_failure = now;
        }
        entry.failures += 1;
    }

    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}
