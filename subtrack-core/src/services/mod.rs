//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod logging;
pub mod migration;
mod subscription;

pub use logging::{LogEntry, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use subscription::SubscriptionService;
