//! Admission control
//!
//! Fixed-window request cap per identity. One entry per identity lives in
//! a concurrent map; the map's entry guard serializes the
//! read-compare-increment per key, so two concurrent requests for the
//! same identity can never both slip past the cap. A background reaper
//! purges expired entries, bounding memory to the active-identity count.
//!
//! The window is a strict reset-on-expiry fixed window, not a sliding
//! one: callers can burst up to twice the cap across a window boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::watch;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Rejected; the window resets in `reset_in` seconds
    Limited { reset_in: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// One per identity, mutated in place under the map's entry guard
struct RateLimitEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Fixed-window rate limiter
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Check the identity's budget and consume one request from it
    pub fn check_and_consume(&self, identity: &str) -> RateLimitDecision {
        self.check_at(identity, Instant::now())
    }

    /// Admission check against an explicit clock. Tests drive window
    /// expiry through this without sleeping.
    fn check_at(&self, identity: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_reset_at: now + self.window,
            });

        // Lazily expired: the window restarts on the first request after
        // its reset instant.
        if now > entry.window_reset_at {
            entry.count = 0;
            entry.window_reset_at = now + self.window;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateLimitDecision::Allowed
        } else {
            let reset_in = entry
                .window_reset_at
                .saturating_duration_since(now)
                .as_secs_f64()
                .ceil() as u64;
            RateLimitDecision::Limited { reset_in }
        }
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.entries.len()
    }

    /// Drop entries whose window has expired
    fn reap(&self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.window_reset_at);
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Reaped rate limit entries");
        }
    }

    /// Start the background reaper, one pass per window duration.
    ///
    /// Returns a shutdown sender that stops the task.
    pub fn start_reaper(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let limiter = Arc::clone(self);
        let interval = limiter.window;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.reap(Instant::now());
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Rate limit reaper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_cap_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);

        for _ in 0..3 {
            assert!(limiter.check_and_consume("u1").is_allowed());
        }

        match limiter.check_and_consume("u1") {
            RateLimitDecision::Limited { reset_in } => {
                assert!(reset_in > 0);
                assert!(reset_in <= 60);
            }
            RateLimitDecision::Allowed => panic!("request over cap was admitted"),
        }
    }

    #[test]
    fn test_window_expiry_readmits() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        let base = Instant::now();

        assert!(limiter.check_at("u1", base).is_allowed());
        assert!(limiter.check_at("u1", base).is_allowed());
        assert!(!limiter.check_at("u1", base).is_allowed());

        // After the window elapses the same identity succeeds again, up to
        // the cap.
        let later = base + Duration::from_secs(61);
        assert!(limiter.check_at("u1", later).is_allowed());
        assert!(limiter.check_at("u1", later).is_allowed());
        assert!(!limiter.check_at("u1", later).is_allowed());
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.check_and_consume("u1").is_allowed());
        assert!(!limiter.check_and_consume("u1").is_allowed());
        assert!(limiter.check_and_consume("u2").is_allowed());
    }

    #[test]
    fn test_sixty_per_hour_scenario() {
        let limiter = RateLimiter::new(Duration::from_secs(3600), 60);

        for i in 0..60 {
            assert!(
                limiter.check_and_consume("u1").is_allowed(),
                "request {} within budget was rejected",
                i + 1
            );
        }

        match limiter.check_and_consume("u1") {
            RateLimitDecision::Limited { reset_in } => assert!(reset_in <= 3600),
            RateLimitDecision::Allowed => panic!("61st request was admitted"),
        }
    }

    #[test]
    fn test_no_lost_updates_under_contention() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), 100));

        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for _ in 0..8 {
                let limiter = Arc::clone(&limiter);
                handles.push(scope.spawn(move || {
                    let mut allowed = 0u32;
                    for _ in 0..25 {
                        if limiter.check_and_consume("u1").is_allowed() {
                            allowed += 1;
                        }
                    }
                    allowed
                }));
            }
            let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
            // 200 concurrent attempts, exactly the cap admitted.
            assert_eq!(total, 100);
        });
    }

    #[test]
    fn test_reap_drops_expired_entries() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 5);
        let base = Instant::now();

        limiter.check_at("u1", base);
        limiter.check_at("u2", base);
        assert_eq!(limiter.tracked_identities(), 2);

        limiter.reap(base + Duration::from_secs(30));
        assert_eq!(limiter.tracked_identities(), 2);

        limiter.reap(base + Duration::from_secs(61));
        assert_eq!(limiter.tracked_identities(), 0);
    }
}
