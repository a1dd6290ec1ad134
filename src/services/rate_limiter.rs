//! Sliding-window limiter for login attempts
//!
//! Failed attempts are counted per username (case-insensitive) and every
//! attempt is counted per client IP. Either window being full blocks the
//! login until old attempts age out.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Attempt timestamps per key inside a fixed-length window
struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    attempts: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    async fn is_full(&self, key: K, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        let mut attempts = self.attempts.write().await;
        match attempts.get_mut(&key) {
            Some(times) => {
                times.retain(|t| *t > cutoff);
                let full = times.len() >= self.limit;
                if times.is_empty() {
                    attempts.remove(&key);
                }
                full
            }
            None => false,
        }
    }

    async fn push(&self, key: K, now: DateTime<Utc>) {
        self.attempts.write().await.entry(key).or_default().push(now);
    }

    async fn forget(&self, key: &K) {
        self.attempts.write().await.remove(key);
    }

    async fn prune(&self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.attempts.write().await.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }
}

/// Login rate limiter
pub struct LoginRateLimiter {
    usernames: SlidingWindow<String>,
    ips: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    /// 5 failures per username per 15 minutes, 10 attempts per IP per minute
    pub fn new() -> Self {
        Self::with_limits(5, Duration::minutes(15), 10, Duration::minutes(1))
    }

    pub fn with_limits(
        username_limit: usize,
        username_window: Duration,
        ip_limit: usize,
        ip_window: Duration,
    ) -> Self {
        Self {
            usernames: SlidingWindow::new(username_limit, username_window),
            ips: SlidingWindow::new(ip_limit, ip_window),
        }
    }

    pub async fn is_username_limited(&self, username: &str) -> bool {
        self.usernames.is_full(username.to_lowercase(), Utc::now()).await
    }

    pub async fn record_failed_attempt(&self, username: &str) {
        self.usernames.push(username.to_lowercase(), Utc::now()).await;
    }

    /// Forget failures for `username` after a successful login
    pub async fn clear_username_attempts(&self, username: &str) {
        self.usernames.forget(&username.to_lowercase()).await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_full(ip, Utc::now()).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.push(ip, Utc::now()).await;
    }

    /// Drop expired attempts for every key
    pub async fn cleanup(&self) {
        let now = Utc::now();
        self.usernames.prune(now).await;
        self.ips.prune(now).await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
