// src/limiter.rs
// =============================================================================
// Per-caller admission control over a trailing time window.
//
// Each caller has a queue of the instants at which they were admitted. A new
// request is admitted when fewer than `max_requests` of those instants are
// strictly newer than `now - window`. Expired instants are pruned lazily,
// whenever that caller asks again.
//
// Check and record happen under one lock. Two concurrent requests from the
// same caller can therefore never both see "4 of 5 used" and both get in.
//
// A rejection always reports the configured retry-after value; it is not
// computed from the age of the oldest entry.
// =============================================================================

use crate::config::RateLimitSettings;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Answer to an admission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Zero when allowed
    pub retry_after_secs: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    retry_after_secs: u64,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window: Duration::from_secs(settings.window_secs),
            retry_after_secs: settings.retry_after_secs,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or reject one request from `caller_id`, recording it if admitted
    pub fn admit(&self, caller_id: &str) -> Admission {
        self.admit_at(caller_id, Instant::now())
    }

    fn admit_at(&self, caller_id: &str, now: Instant) -> Admission {
        // A poisoned lock only means another admit panicked mid-update;
        // the map itself is still usable.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let admitted = windows.entry(caller_id.to_string()).or_default();

        // Entries at or before the cutoff have left the window
        if let Some(cutoff) = now.checked_sub(self.window) {
            while admitted.front().is_some_and(|&at| at <= cutoff) {
                admitted.pop_front();
            }
        }

        if admitted.len() >= self.max_requests {
            warn!(
                caller_id,
                used = admitted.len(),
                limit = self.max_requests,
                "rate limit exceeded"
            );
            return Admission {
                allowed: false,
                retry_after_secs: self.retry_after_secs,
            };
        }

        admitted.push_back(now);
        debug!(caller_id, used = admitted.len(), limit = self.max_requests, "request admitted");

        Admission {
            allowed: true,
            retry_after_secs: 0,
        }
    }

    /// Admissions still inside the window for `caller_id`
    #[cfg(test)]
    fn in_window(&self, caller_id: &str) -> usize {
        let now = Instant::now();
        let windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        windows.get(caller_id).map_or(0, |admitted| match now.checked_sub(self.window) {
            Some(cutoff) => admitted.iter().filter(|&&at| at > cutoff).count(),
            None => admitted.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter() -> RateLimiter {
        RateLimiter::new(&RateLimitSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_request_in_window_is_rejected() {
        let limiter = limiter();

        for _ in 0..5 {
            assert!(limiter.admit("caller-1").allowed);
            tokio::time::advance(Duration::from_secs(60)).await;
        }

        let rejected = limiter.admit("caller-1");
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after_secs, 3600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callers_are_isolated() {
        let limiter = limiter();

        for _ in 0..5 {
            assert!(limiter.admit("busy").allowed);
        }
        assert!(!limiter.admit("busy").allowed);

        let other = limiter.admit("quiet");
        assert!(other.allowed);
        assert_eq!(other.retry_after_secs, 0);
        assert_eq!(limiter.in_window("quiet"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_again_after_the_window_rolls() {
        let limiter = limiter();

        for _ in 0..5 {
            assert!(limiter.admit("caller").allowed);
        }
        assert!(!limiter.admit("caller").allowed);

        // Rejections are not recorded, so only the first five matter
        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(!limiter.admit("caller").allowed);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.admit("caller").allowed);
        assert_eq!(limiter.in_window("caller"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_per_entry() {
        let limiter = limiter();

        assert!(limiter.admit("caller").allowed);
        tokio::time::advance(Duration::from_secs(1800)).await;
        for _ in 0..4 {
            assert!(limiter.admit("caller").allowed);
        }
        assert!(!limiter.admit("caller").allowed);

        // Only the first entry has expired
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(limiter.admit("caller").allowed);
        assert!(!limiter.admit("caller").allowed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_the_limit() {
        let limiter = Arc::new(limiter());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.admit("racer").allowed })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 5);
    }
}
