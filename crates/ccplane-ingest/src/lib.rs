//! Heartbeat ingestion, drift classification, and the refresh-trigger
//! pipeline (spec.md §4.1, §5).

mod dedup;
mod drift;
mod error;
mod heartbeat;
mod lock;
mod orchestrator;
pub mod ports;

pub use dedup::DedupCache;
pub use drift::DriftService;
pub use error::IngestError;
pub use heartbeat::{HeartbeatPayload, HeartbeatService, HeartbeatServiceConfig, IngestOutcome, IngestResult};
pub use lock::InstanceLocks;
pub use orchestrator::IngestOrchestrator;
pub use ports::{fakes, CsotAdapter, RefreshPublisher};
