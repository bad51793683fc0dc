mod bulkhead;
mod circuit_breaker;
mod deadline;
mod retry;

pub use bulkhead::Bulkhead;
pub use circuit_breaker::CircuitBreaker;
pub use deadline::Deadline;
pub use retry::retry_on_conflict;
