//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod cost;
mod month_year;
pub mod result;
mod subscription;

pub use cost::{CostFilter, Period};
pub use month_year::{MonthYear, ParseMonthYearError};
pub use subscription::{NewSubscription, Subscription};
