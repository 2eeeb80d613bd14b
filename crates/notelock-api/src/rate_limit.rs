use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notelock_core::util::user_fingerprint;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window limiter keyed by endpoint and caller key
///
/// Login is keyed by the claimed user id, registration by client address.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    login_limit: u32,
    register_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Clone, Copy)]
pub enum ProtectedEndpoint {
    Login,
    Register,
}

#[derive(Default)]
struct RateLimitMetrics {
    login_allowed: AtomicU64,
    login_limited: AtomicU64,
    register_allowed: AtomicU64,
    register_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub login_allowed: u64,
    pub login_limited: u64,
    pub register_allowed: u64,
    pub register_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.login_rate_limit_per_window,
            config.register_rate_limit_per_window,
        )
    }

    fn new(window: Duration, login_limit: u32, register_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            login_limit,
            register_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, key: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::Login => self.login_limit,
            ProtectedEndpoint::Register => self.register_limit,
        };

        let bucket = format!("{}:{key}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        guard.retain(|_, window| now.duration_since(window.started_at) < self.window);
        let entry = guard.entry(bucket).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs()
                .max(1);
            self.counter(endpoint, false).fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                endpoint = endpoint.label(),
                key = user_fingerprint(key),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Too many attempts, try again later",
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.counter(endpoint, true).fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            login_allowed: self.metrics.login_allowed.load(Ordering::Relaxed),
            login_limited: self.metrics.login_limited.load(Ordering::Relaxed),
            register_allowed: self.metrics.register_allowed.load(Ordering::Relaxed),
            register_limited: self.metrics.register_limited.load(Ordering::Relaxed),
        }
    }

    fn counter(&self, endpoint: ProtectedEndpoint, allowed: bool) -> &AtomicU64 {
        match (endpoint, allowed) {
            (ProtectedEndpoint::Login, true) => &self.metrics.login_allowed,
            (ProtectedEndpoint::Login, false) => &self.metrics.login_limited,
            (ProtectedEndpoint::Register, true) => &self.metrics.register_allowed,
            (ProtectedEndpoint::Register, false) => &self.metrics.register_limited,
        }
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
        }
    }
}
