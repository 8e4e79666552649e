//! Redis-backed window store.
//!
//! Each rate-limit key maps to a sorted set whose members are
//! `"{timestamp}-{seq}"` strings scored by their admission timestamp in
//! epoch milliseconds. Scores are monotonically meaningful (higher = more
//! recent) and range operations are native to the sorted set, which is
//! what makes pruning and the oldest-member lookup cheap.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::Result;

use super::store::WindowStore;

/// Window store backed by Redis sorted sets.
///
/// Clones share one multiplexed connection; each store operation is a
/// single atomic Redis command.
#[derive(Clone)]
pub struct RedisWindowStore {
    conn: ConnectionManager,
}

impl RedisWindowStore {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Wrap an already-established connection manager.
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn prune(&self, key: &str, max_score: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _removed: u64 = conn.zrembyscore(key, 0, max_score).await?;
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.zcard(key).await?)
    }

    async fn insert(&self, key: &str, score: u64, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _added: u64 = conn.zadd(key, member, score).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _set: bool = conn.expire(key, ttl_secs as i64).await?;
        Ok(())
    }

    async fn oldest_score(&self, key: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let oldest: Vec<(String, u64)> = conn.zrange_withscores(key, 0, 0).await?;
        Ok(oldest.first().map(|(_, score)| *score))
    }
}
