//! Subscription domain model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::month_year::MonthYear;
use super::result::{Error, Result};

/// Subscription data as supplied by a caller
///
/// Dates are still text here; the store parses them on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub service_name: String,
    /// Monthly price in minor currency units
    pub price: u32,
    pub user_id: Uuid,
    /// `MM-YYYY`
    pub start_date: String,
    /// `MM-YYYY`, absent or empty for an open-ended subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl NewSubscription {
    pub fn new(
        service_name: impl Into<String>,
        price: u32,
        user_id: Uuid,
        start_date: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            price,
            user_id,
            start_date: start_date.into(),
            end_date: None,
        }
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    /// Validate fields the boundary must reject before reaching the store
    pub fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.service_name.trim().is_empty() {
            return Err("service_name cannot be empty");
        }
        if self.start_date.is_empty() {
            return Err("start_date is required");
        }
        Ok(())
    }

    /// Parse both dates. An empty end date means the subscription is open-ended.
    pub(crate) fn parse_period(&self) -> Result<(MonthYear, Option<MonthYear>)> {
        let start = self
            .start_date
            .parse()
            .map_err(|_| Error::invalid_date("start_date", &self.start_date))?;

        let end = match self.end_date.as_deref() {
            None | Some("") => None,
            Some(s) => Some(s.parse().map_err(|_| Error::invalid_date("end_date", s))?),
        };

        Ok((start, end))
    }
}

/// A persisted subscription record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_name: String,
    pub price: u32,
    pub start_date: MonthYear,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<MonthYear>,
}

impl Subscription {
    /// Build a record from caller input with an already parsed period
    pub fn from_input(
        id: Uuid,
        input: &NewSubscription,
        start_date: MonthYear,
        end_date: Option<MonthYear>,
    ) -> Self {
        Self {
            id,
            user_id: input.user_id,
            service_name: input.service_name.clone(),
            price: input.price,
            start_date,
            end_date,
        }
    }

    /// True if the subscription has no end date
    pub fn is_open_ended(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether this record is active at any point in `[start, end]`
    pub fn overlaps(&self, start: MonthYear, end: MonthYear) -> bool {
        self.start_date <= end && self.end_date.map_or(true, |e| e >= start)
    }
}
