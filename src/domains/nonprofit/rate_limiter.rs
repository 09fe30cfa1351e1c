//! Sliding-window rate limiter shared by every outbound upstream request.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

/// Caps outbound requests to `max_requests` per trailing `window`.
///
/// The timestamp queue lives behind an async mutex that is held across the
/// whole evict-check-wait-record sequence, so concurrent callers are admitted
/// strictly one at a time, in lock order.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            requests: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Wait until a request slot is free, then claim it.
    pub async fn acquire(&self) {
        let mut requests = self.requests.lock().await;

        self.evict_expired(&mut requests, Instant::now());

        if requests.len() >= self.max_requests {
            if let Some(&oldest) = requests.front() {
                let wait = self.window.saturating_sub(Instant::now() - oldest);
                if !wait.is_zero() {
                    info!("Rate limit reached, waiting {:.2} seconds", wait.as_secs_f64());
                    tokio::time::sleep(wait).await;
                }
            }
            self.evict_expired(&mut requests, Instant::now());
        }

        requests.push_back(Instant::now());
    }

    /// Number of requests currently counted against the window.
    pub async fn in_flight_window(&self) -> usize {
        let mut requests = self.requests.lock().await;
        self.evict_expired(&mut requests, Instant::now());
        requests.len()
    }

    fn evict_expired(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = requests.front() {
            if now - front >= self.window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_under_budget_returns_immediately() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight_window().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_acquire_waits_for_oldest_to_expire() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.acquire().await;

        limiter.acquire().await;
        assert!(start.elapsed() >= WINDOW);
        assert!(start.elapsed() < WINDOW + Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_acquire_suspends_caller() {
        let limiter = RateLimiter::new(2, WINDOW);
        limiter.acquire().await;
        limiter.acquire().await;

        let blocked = tokio::time::timeout(Duration::from_secs(30), limiter.acquire()).await;
        assert!(blocked.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_after_window_returns_immediately() {
        let limiter = RateLimiter::new(2, WINDOW);
        limiter.acquire().await;
        limiter.acquire().await;

        tokio::time::advance(Duration::from_secs(61)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight_window().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_share_last_slot() {
        let limiter = Arc::new(RateLimiter::new(2, WINDOW));
        let start = Instant::now();

        let timed = move |limiter: Arc<RateLimiter>| async move {
            limiter.acquire().await;
            start.elapsed()
        };

        let (a, b, c) = tokio::join!(
            timed(limiter.clone()),
            timed(limiter.clone()),
            timed(limiter.clone())
        );

        let waited = [a, b, c].iter().filter(|d| **d >= WINDOW).count();
        assert_eq!(waited, 1);
    }

    #[test]
    fn test_zero_budget_is_clamped() {
        let limiter = RateLimiter::new(0, WINDOW);
        assert_eq!(limiter.max_requests, 1);
    }
}
