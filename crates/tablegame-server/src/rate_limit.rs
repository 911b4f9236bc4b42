use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AppError;
use crate::state::AppState;

/// Token bucket. Starts full; refills continuously at `refill_rate` per second.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl TokenBucket {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Take one token. Returns false when the bucket is empty.
    pub fn try_take(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.duration_since(self.last_refill)
    }
}

/// One token bucket per client IP, for the REST API.
pub struct IpRateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    max_tokens: f64,
    refill_rate: f64,
}

impl IpRateLimiter {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check_rate_limit(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.max_tokens, self.refill_rate))
            .try_take()
    }

    /// Forget IPs that haven't made a request within `max_age`.
    /// Returns how many were dropped.
    pub async fn cleanup(&self, max_age: Duration) -> usize {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.idle_for(now) < max_age);
        before - buckets.len()
    }
}

/// Axum middleware rejecting API requests over the per-IP budget with 429.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    // Requests without peer info are not limited.
    if let Some(ip) = ip
        && !state.api_limiter.check_rate_limit(ip).await
    {
        tracing::debug!(%ip, path = %request.uri().path(), "API rate limited");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_drains_without_refill() {
        let mut bucket = TokenBucket::new(2.0, 0.0);
        assert!(bucket.try_take());
        assert!(bucket.try_take());
        assert!(!bucket.try_take());
    }

    #[tokio::test]
    async fn rejects_requests_over_limit() {
        let limiter = IpRateLimiter::new(3.0, 0.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..3 {
            assert!(limiter.check_rate_limit(ip).await);
        }
        assert!(!limiter.check_rate_limit(ip).await);
    }

    #[tokio::test]
    async fn separate_buckets_per_ip() {
        let limiter = IpRateLimiter::new(1.0, 0.0);
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check_rate_limit(ip1).await);
        assert!(!limiter.check_rate_limit(ip1).await);
        assert!(limiter.check_rate_limit(ip2).await);
    }

    #[tokio::test]
    async fn refills_over_time() {
        let limiter = IpRateLimiter::new(2.0, 100.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check_rate_limit(ip).await);
        assert!(limiter.check_rate_limit(ip).await);
        assert!(!limiter.check_rate_limit(ip).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(limiter.check_rate_limit(ip).await);
    }

    #[tokio::test]
    async fn cleanup_removes_stale_entries() {
        let limiter = IpRateLimiter::new(5.0, 5.0);
        limiter
            .check_rate_limit("127.0.0.1".parse().unwrap())
            .await;
        assert_eq!(limiter.cleanup(Duration::from_secs(60)).await, 0);
        assert_eq!(limiter.cleanup(Duration::ZERO).await, 1);
        assert!(limiter.buckets.lock().await.is_empty());
    }
}
