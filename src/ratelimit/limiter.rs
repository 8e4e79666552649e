//! Core sliding-window-log limiter.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::FloodgateConfig;
use crate::error::{FloodgateError, Result};

use super::policy::{Policy, RequestInfo};
use super::store::WindowStore;

/// Default prefix applied to store keys.
const DEFAULT_KEY_PREFIX: &str = "ratelimit";
/// Default upper bound on a single window store call.
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(1000);

/// The admission decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The configured per-window capacity.
    pub limit: u64,
    /// Requests left in the current window after this one.
    pub remaining: u64,
    /// Epoch seconds at which quota becomes available again. Guaranteed
    /// meaningful on rejection; synthesized as `now + window` on admission.
    pub reset_epoch_secs: u64,
    /// Set when the window store was unavailable and the request was
    /// admitted without quota accounting.
    pub degraded: bool,
}

impl Decision {
    fn allow(limit: u64, remaining: u64, reset_epoch_secs: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_epoch_secs,
            degraded: false,
        }
    }

    fn reject(limit: u64, reset_epoch_secs: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_epoch_secs,
            degraded: false,
        }
    }

    fn degraded(limit: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: 0,
            reset_epoch_secs: 0,
            degraded: true,
        }
    }

    /// The `X-RateLimit-*` headers for this decision, or `None` on the
    /// degraded path where no quota state was consulted.
    pub fn headers(&self) -> Option<[(&'static str, String); 3]> {
        if self.degraded {
            return None;
        }
        Some([
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_epoch_secs.to_string()),
        ])
    }

    /// Convert a rejection into the error the HTTP layer propagates.
    pub fn try_admit(self) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(FloodgateError::QuotaExceeded {
                limit: self.limit,
                reset_epoch_secs: self.reset_epoch_secs,
            })
        }
    }
}

/// Sliding-window-log rate limiter over a shared window store.
///
/// One admitted request stores one timestamped entry; only entries inside
/// the trailing window count toward capacity, so quota recovers as entries
/// age out individually rather than at fixed interval boundaries.
///
/// The limiter holds no lock across requests. Each store operation is
/// atomic in isolation but the per-call sequence is not transactional:
/// concurrent checks against one key can transiently over-admit by at most
/// the number of in-flight requests, which is accepted slack.
pub struct SlidingWindowLimiter {
    policy: Policy,
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
    store_timeout: Duration,
    fail_open: bool,
    /// Disambiguates admissions that share a millisecond.
    sequence: AtomicU64,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the given policy over a window store.
    pub fn new(policy: Policy, store: Arc<dyn WindowStore>) -> Self {
        Self {
            policy,
            store,
            clock: Arc::new(SystemClock),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            fail_open: true,
            sequence: AtomicU64::new(0),
        }
    }

    /// Create a limiter from configuration.
    pub fn from_config(config: &FloodgateConfig, store: Arc<dyn WindowStore>) -> Self {
        let policy = Policy::new(
            config.rate_limiting.window_ms,
            config.rate_limiting.max_requests,
        );
        Self::new(policy, store)
            .with_key_prefix(&config.store.key_prefix)
            .with_store_timeout(Duration::from_millis(config.store.timeout_ms))
            .with_fail_open(config.rate_limiting.fail_open)
    }

    /// Substitute the time source. Tests use this to drive the window.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the store key prefix.
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    /// Override the per-call store timeout.
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Choose between fail-open (admit on store failure, the default) and
    /// fail-closed (surface `StoreUnavailable` to the caller).
    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide whether to admit a request.
    ///
    /// Never returns `QuotaExceeded`; a rejection comes back as a
    /// [`Decision`] with `allowed == false` and the caller converts it via
    /// [`Decision::try_admit`]. With fail-open enabled (the default) this
    /// method never errors at all: store failures admit the request on the
    /// degraded path.
    pub async fn admit(&self, request: &RequestInfo) -> Result<Decision> {
        let key = format!("{}:{}", self.key_prefix, self.policy.derive_key(request));
        trace!(key = %key, "checking rate limit");

        match self.check(&key).await {
            Ok(decision) => Ok(decision),
            Err(err) if self.fail_open => {
                warn!(
                    key = %key,
                    error = %err,
                    "window store degraded, admitting without quota accounting"
                );
                Ok(Decision::degraded(self.policy.max_requests))
            }
            Err(err) => Err(err),
        }
    }

    async fn check(&self, key: &str) -> Result<Decision> {
        let limit = self.policy.max_requests;
        let window_ms = self.policy.window_ms;

        let now = self.clock.now_ms();

        // Entries at or before the window start no longer count; removing
        // them also bounds the set to at most `limit` members in steady
        // state. Running this twice in a row is harmless. A window reaching
        // past the epoch holds nothing prunable, so a score-0 entry must
        // survive rather than be caught by the inclusive boundary.
        if let Some(window_start) = now.checked_sub(window_ms) {
            self.store_call(self.store.prune(key, window_start)).await?;
        }

        let current = self.store_call(self.store.count(key)).await?;

        if current >= limit {
            // The rejection stands regardless of what the oldest-member
            // lookup does; a failure there only degrades the reset hint.
            let reset_at_ms = match self.store_call(self.store.oldest_score(key)).await {
                Ok(Some(oldest)) => oldest + window_ms,
                Ok(None) | Err(_) => now + window_ms,
            };
            debug!(key = %key, current = current, limit = limit, "rate limit exceeded");
            return Ok(Decision::reject(limit, reset_at_ms.div_ceil(1000)));
        }

        // Admissions sharing a millisecond stay distinct members.
        let member = format!("{}-{}", now, self.sequence.fetch_add(1, Ordering::Relaxed));
        self.store_call(self.store.insert(key, now, &member)).await?;

        // TTL covers the whole window so an idle key disappears on its own,
        // which reads the same as an empty window.
        self.store_call(self.store.expire(key, window_ms.div_ceil(1000)))
            .await?;

        Ok(Decision::allow(
            limit,
            limit - current - 1,
            (now + window_ms).div_ceil(1000),
        ))
    }

    /// Run one store operation under the configured timeout. No retries:
    /// a slow store degrades to fail-open, not to stacked latency.
    async fn store_call<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.store_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(FloodgateError::StoreUnavailable(format!(
                "window store call exceeded {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}
