//! Subtrack Core - subscription ledger and cost aggregation
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Subscription, MonthYear, CostFilter)
//! - **ports**: Trait definitions for external dependencies (repository, event log)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{EventLog, NullEventLog};
use services::{LoggingService, SubscriptionService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind};
pub use domain::{CostFilter, MonthYear, NewSubscription, Period, Subscription};
pub use ports::{LogEvent, LogLevel};
pub use services::LogEntry;

/// Main context for subtrack operations
///
/// Holds the configuration, the opened repository, the event log and the
/// subscription service wired over them.
pub struct SubtrackContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    /// `None` when the event log is disabled or could not be opened
    pub logging: Option<Arc<LoggingService>>,
    pub subscriptions: SubscriptionService,
}

impl SubtrackContext {
    /// Create a new context rooted at the data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&config.database_path(data_dir))?);

        // Initialize schema
        repository.ensure_schema()?;

        let logging = if config.event_log {
            LoggingService::new(data_dir, env!("CARGO_PKG_VERSION"), config.log_level)
                .ok()
                .map(Arc::new)
        } else {
            None
        };

        let event_log: Arc<dyn EventLog> = match &logging {
            Some(service) => Arc::clone(service) as Arc<dyn EventLog>,
            None => Arc::new(NullEventLog),
        };

        let subscriptions = SubscriptionService::new(Arc::clone(&repository) as _, event_log);

        Ok(Self {
            config,
            repository,
            logging,
            subscriptions,
        })
    }
}
