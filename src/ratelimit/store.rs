//! Window store trait and the in-memory implementation.
//!
//! The limiter talks to its store through five narrow operations over an
//! ordered collection of (score, member) pairs per key, where the score is
//! an epoch-millisecond timestamp. Each operation is atomic in isolation;
//! the sequence of operations within one admission check is not.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

/// Trait for window store implementations.
///
/// Abstracts over the Redis-backed store and the in-memory store so the
/// limiter can work with either, and so tests can substitute a failing one.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Remove every member of `key` with score ≤ `max_score`.
    async fn prune(&self, key: &str, max_score: u64) -> Result<()>;

    /// Number of members currently held under `key`.
    async fn count(&self, key: &str) -> Result<u64>;

    /// Add one member under `key` with the given score. Members are unique;
    /// concurrent inserts with distinct members never overwrite each other.
    async fn insert(&self, key: &str, score: u64, member: &str) -> Result<()>;

    /// Set or refresh the key's time-to-live. Best effort: firing early only
    /// makes the limiter more permissive, firing late is the failure mode
    /// to avoid.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;

    /// Score of the oldest member under `key`, if any.
    async fn oldest_score(&self, key: &str) -> Result<Option<u64>>;
}

/// In-process window store.
///
/// Suitable for tests and single-process deployments; multi-process
/// deployments need the shared Redis store for a consistent view.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, BTreeSet<(u64, String)>>,
    ttls: DashMap<String, u64>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The TTL most recently set for a key. Test observability only; the
    /// in-memory store does not enforce expiry.
    pub fn last_ttl(&self, key: &str) -> Option<u64> {
        self.ttls.get(key).map(|t| *t)
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn prune(&self, key: &str, max_score: u64) -> Result<()> {
        if let Some(mut window) = self.windows.get_mut(key) {
            window.retain(|(score, _)| *score > max_score);
        }
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64> {
        Ok(self.windows.get(key).map_or(0, |w| w.len() as u64))
    }

    async fn insert(&self, key: &str, score: u64, member: &str) -> Result<()> {
        self.windows
            .entry(key.to_string())
            .or_default()
            .insert((score, member.to_string()));
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        self.ttls.insert(key.to_string(), ttl_secs);
        Ok(())
    }

    async fn oldest_score(&self, key: &str) -> Result<Option<u64>> {
        Ok(self
            .windows
            .get(key)
            .and_then(|w| w.iter().next().map(|(score, _)| *score)))
    }
}
