use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("L2 cache backend error: {0}")]
    Backend(String),

    #[error("failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),
}
