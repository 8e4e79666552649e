//! Error types for the Floodgate limiter.

use thiserror::Error;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// The caller has exhausted its quota for the current window.
    ///
    /// This is the only condition that terminates the request pipeline
    /// early; it maps to HTTP 429 with rate-limit headers attached.
    #[error("Too many requests, please try again later")]
    QuotaExceeded {
        /// The configured per-window capacity.
        limit: u64,
        /// Epoch seconds at which the oldest window entry ages out.
        reset_epoch_secs: u64,
    },

    /// The window store could not be reached or operated (network error,
    /// timeout, protocol error). Absorbed by the limiter when fail-open
    /// is enabled; never surfaced to the end client.
    #[error("Window store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FloodgateError {
    /// The HTTP status code this error maps to at the edge.
    pub fn http_status(&self) -> u16 {
        match self {
            FloodgateError::QuotaExceeded { .. } => 429,
            _ => 500,
        }
    }

    /// The JSON body the HTTP layer should return for this error.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "message": self.to_string(),
        })
    }
}

impl From<redis::RedisError> for FloodgateError {
    fn from(err: redis::RedisError) -> Self {
        FloodgateError::StoreUnavailable(err.to_string())
    }
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exceeded_maps_to_429() {
        let err = FloodgateError::QuotaExceeded {
            limit: 100,
            reset_epoch_secs: 1_700_000_000,
        };
        assert_eq!(err.http_status(), 429);
        assert_eq!(err.to_string(), "Too many requests, please try again later");
    }

    #[test]
    fn test_store_unavailable_maps_to_500() {
        let err = FloodgateError::StoreUnavailable("connection refused".to_string());
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_error_body_shape() {
        let err = FloodgateError::QuotaExceeded {
            limit: 3,
            reset_epoch_secs: 1,
        };
        let body = err.body();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Too many requests, please try again later");
    }
}
