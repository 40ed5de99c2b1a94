use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

use crate::models::Id;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut hits = self.store.entry(key.to_string()).or_default();
        while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
            hits.pop_front();
        }
        if hits.len() >= limit {
            return false;
        }
        hits.push_back(now);
        true
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub post_limit: usize,
    pub post_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { post_limit: 10, post_window: Duration::from_secs(60) }
    }
}

/// Per-author guard on node creation.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn allow_post(&self, author: Id) -> bool {
        self.limiter.check(&format!("post:{author}"), self.cfg.post_limit, self.cfg.post_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 { assert!(rl.check("k", 3, window)); }
        assert!(!rl.check("k", 3, window));
        std::thread::sleep(Duration::from_millis(60));
        assert!(rl.check("k", 3, window));
    }

    #[test]
    fn authors_are_limited_independently() {
        let facade = RateLimiterFacade::new(
            InMemoryRateLimiter::new(true),
            RateLimitConfig { post_limit: 1, post_window: Duration::from_secs(300) },
        );
        assert!(facade.allow_post(1));
        assert!(!facade.allow_post(1));
        assert!(facade.allow_post(2));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..10 { assert!(rl.check("k", 1, Duration::from_secs(60))); }
    }
}
