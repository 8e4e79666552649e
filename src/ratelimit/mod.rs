//! Rate limiting logic and window store adapters.

mod limiter;
mod policy;
mod redis_store;
mod store;

pub use limiter::{Decision, SlidingWindowLimiter};
pub use policy::{KeyGenerator, Policy, RequestInfo};
pub use redis_store::RedisWindowStore;
pub use store::{MemoryWindowStore, WindowStore};
