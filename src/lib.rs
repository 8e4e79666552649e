//! Floodgate - Sliding-Window Request Rate Limiting
//!
//! This crate implements admission control for HTTP services using a
//! sliding-window-log algorithm over a shared, network-accessible window
//! store (Redis sorted sets). The surrounding HTTP layer calls
//! [`ratelimit::SlidingWindowLimiter::admit`] once per inbound request and
//! either proceeds or rejects with HTTP 429 based on the returned decision.
//!
//! When the window store is unreachable the limiter fails open by default:
//! availability of the protected service takes priority over strict quota
//! enforcement while the quota-tracking dependency is degraded.

pub mod clock;
pub mod config;
pub mod error;
pub mod ratelimit;
