//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the SubscriptionRepository port
//! - An in-memory repository for service tests

pub mod duckdb;

#[cfg(test)]
pub mod memory;
