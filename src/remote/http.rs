use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{RateLimitConfig, RetryConfig};
use crate::errors::RemoteError;
use crate::observability::remote_metrics;

/// Shared HTTP stack: timeout, transient-failure retries with exponential
/// backoff, and a client-side rate limiter
#[derive(Clone)]
pub struct RateLimitedHttpClient {
    client: ClientWithMiddleware,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for RateLimitedHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedHttpClient").finish_non_exhaustive()
    }
}

impl RateLimitedHttpClient {
    pub fn new(
        timeout: Duration,
        retry: &RetryConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self, RemoteError> {
        let per_second = NonZeroU32::new(rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(rate_limit.burst_capacity).unwrap_or(per_second);
        let rate_limiter = Arc::new(RateLimiter::direct(
            Quota::per_second(per_second).allow_burst(burst),
        ));

        let reqwest_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("client-board/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // 5xx, 408, 429 and connection failures are retried; the request
        // (headers included) is resent as built
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(retry.base_delay(), retry.max_delay())
            .build_with_max_retries(retry.max_retries());

        let client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Wait for rate-limit permission, then hand out the client
    pub async fn acquire(&self) -> &ClientWithMiddleware {
        if self.rate_limiter.check().is_err() {
            remote_metrics().record_rate_limit_wait();
            debug!("Rate limit reached, waiting for permission");
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
        }
        remote_metrics().record_request();
        &self.client
    }
}
