//! Usage tracking infrastructure implementations

mod in_memory;
mod postgres;
mod service;

pub use in_memory::InMemoryUsageRecordRepository;
pub use postgres::PostgresUsageRecordRepository;
pub use service::{RecordUsageParams, UsageTrackingService, UsageTrackingServiceTrait};
