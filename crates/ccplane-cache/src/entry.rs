use tokio::time::Instant;

/// A value paired with the instant it expires. Used by the L1 tier and the
/// in-memory L2 fake; the Redis-backed L2 relies on native key expiry
/// instead.
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> Entry<V> {
    pub fn new(value: V, ttl: std::time::Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
