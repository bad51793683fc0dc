mod entry;
mod error;
mod l1;
mod l2;
mod metrics;
mod registry;
mod two_level;
mod warmer;

pub use error::CacheError;
pub use l1::L1Cache;
pub use l2::{InMemoryL2Cache, L2Cache};
pub use metrics::CacheMetrics;
pub use registry::{expected_hash_key, permissions_key, CacheRegistry, CacheTtls};
pub use two_level::TwoLevelCache;
pub use warmer::{CachePreWarmer, ExpectedHashSource, ServiceEnvironmentSource};

#[cfg(feature = "redis-backend")]
pub use l2::RedisL2Cache;
