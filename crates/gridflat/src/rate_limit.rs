use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::warn;

/// Token cost of one extraction request. Walking a whole sheet is far
/// heavier than the read endpoints, so it drains the bucket faster.
const EXTRACT_COST: f64 = 5.0;

#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            rate_per_sec: rate_per_sec as f64,
            burst: burst as f64,
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            buckets: Arc::new(DashMap::new()),
            rate_per_sec: self.rate_per_sec,
            burst: self.burst,
        }
    }
}

/// Per-client token bucket over request cost, not request count.
#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    buckets: Arc<DashMap<String, Bucket>>,
    rate_per_sec: f64,
    burst: f64,
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

fn request_cost(path: &str) -> f64 {
    if path.starts_with("/v1/extract") {
        EXTRACT_COST
    } else {
        1.0
    }
}

impl<S, ReqBody> Service<axum::http::Request<ReqBody>> for RateLimiter<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = axum::http::Response<axum::body::Body>>
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        let cost = request_cost(req.uri().path());
        if let Some(client) = client_id(&req)
            && !self.check_and_consume(&client, cost)
        {
            warn!(%client, cost, path = req.uri().path(), "rate limited");
            return Box::pin(async move {
                Ok(axum::http::Response::builder()
                    .status(axum::http::StatusCode::TOO_MANY_REQUESTS)
                    .body(axum::body::Body::from("rate limited"))
                    .unwrap())
            });
        }

        let fut = self.inner.call(req);
        Box::pin(async move { fut.await })
    }
}

fn client_id<B>(req: &axum::http::Request<B>) -> Option<String> {
    // First hop of X-Forwarded-For, set by the fronting proxy. Direct
    // connections without the header are not limited.
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl<S> RateLimiter<S> {
    fn check_and_consume(&self, client: &str, cost: f64) -> bool {
        let mut entry = self.buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last_refill: Instant::now(),
        });
        let now = Instant::now();
        let elapsed = now
            .saturating_duration_since(entry.last_refill)
            .as_secs_f64();
        if elapsed > 0.0 {
            entry.tokens = (entry.tokens + elapsed * self.rate_per_sec).min(self.burst);
            entry.last_refill = now;
        }
        if entry.tokens >= cost {
            entry.tokens -= cost;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_costs_more_than_reads() {
        assert_eq!(request_cost("/v1/extract"), EXTRACT_COST);
        assert_eq!(request_cost("/v1/header"), 1.0);
        assert_eq!(request_cost("/healthz"), 1.0);
    }

    #[test]
    fn bucket_drains_per_cost_and_refuses_when_empty() {
        let limiter = RateLimiterLayer::new(1, 10).layer(());
        assert!(limiter.check_and_consume("203.0.113.9", EXTRACT_COST));
        assert!(limiter.check_and_consume("203.0.113.9", EXTRACT_COST));
        assert!(!limiter.check_and_consume("203.0.113.9", EXTRACT_COST));
        // Another client has its own bucket.
        assert!(limiter.check_and_consume("203.0.113.10", 1.0));
    }
}
