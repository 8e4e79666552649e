//! Rate limit policy and key derivation.

use std::fmt;
use std::sync::Arc;

/// The request attributes the key generator may consult.
///
/// Extracted by the HTTP layer before calling the limiter; the limiter
/// itself never touches the request object.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// Value of the `X-Forwarded-For` header, if present.
    pub forwarded_for: Option<String>,
    /// Value of the `X-Real-IP` header, if present.
    pub real_ip: Option<String>,
}

impl RequestInfo {
    /// A request carrying neither address header.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A request identified by a single client address.
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            forwarded_for: Some(ip.into()),
            real_ip: None,
        }
    }
}

/// A pure function deriving the rate-limit key from a request.
pub type KeyGenerator = Arc<dyn Fn(&RequestInfo) -> String + Send + Sync>;

/// Bucket shared by every caller that presents neither address header.
///
/// All anonymous callers draw from one quota. This coarsening is
/// intentional and load-bearing for callers behind misconfigured proxies;
/// deployments that need finer anonymous attribution should supply their
/// own key generator.
const ANONYMOUS_KEY: &str = "unknown";

/// Immutable per-limiter policy: window length, capacity, and the rule
/// deriving a key from a request.
#[derive(Clone)]
pub struct Policy {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Maximum admitted requests per window
    pub max_requests: u64,
    key_generator: KeyGenerator,
}

impl Policy {
    /// Create a policy with the default key generator: forwarded address,
    /// then real address, then the shared anonymous bucket.
    pub fn new(window_ms: u64, max_requests: u64) -> Self {
        Self {
            window_ms,
            max_requests,
            key_generator: Arc::new(default_key_generator),
        }
    }

    /// Replace the key generator with a caller-supplied rule.
    pub fn with_key_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&RequestInfo) -> String + Send + Sync + 'static,
    {
        self.key_generator = Arc::new(generator);
        self
    }

    /// Derive the rate-limit key for a request. Pure, no I/O.
    pub fn derive_key(&self, request: &RequestInfo) -> String {
        (self.key_generator)(request)
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .finish_non_exhaustive()
    }
}

fn default_key_generator(request: &RequestInfo) -> String {
    // An empty header value counts as absent.
    request
        .forwarded_for
        .as_deref()
        .filter(|v| !v.is_empty())
        .or_else(|| request.real_ip.as_deref().filter(|v| !v.is_empty()))
        .unwrap_or(ANONYMOUS_KEY)
        .to_string()
}
