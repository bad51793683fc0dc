mod error;
mod memory;
mod ports;
mod postgres;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use ports::{
    ApplicationServiceRepository, ApprovalRepository, DriftEventRepository, IamRepository,
    ServiceInstanceRepository, ServiceShareRepository,
};
pub use postgres::PostgresStore;
