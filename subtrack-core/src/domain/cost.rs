//! Cost aggregation criteria

use serde::Serialize;
use uuid::Uuid;

use super::month_year::MonthYear;
use super::subscription::Subscription;

/// Inclusive month range a cost query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: MonthYear,
    pub end: MonthYear,
}

/// Criteria for summing subscription prices
///
/// Every present predicate must hold (conjunctive). A record's active
/// interval is `[start_date, end_date]`, unbounded above when `end_date` is
/// absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub period: Period,
}

impl CostFilter {
    pub fn new(period: Period) -> Self {
        Self {
            user_id: None,
            service_name: None,
            period,
        }
    }

    /// Restrict to one owner. The nil UUID means "any owner".
    pub fn with_user_id(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id.filter(|id| !id.is_nil());
        self
    }

    /// Restrict to one service. An empty name means "any service".
    pub fn with_service_name(mut self, service_name: Option<&str>) -> Self {
        self.service_name = service_name
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self
    }

    /// Evaluate the criteria against a single record
    pub fn matches(&self, sub: &Subscription) -> bool {
        sub.overlaps(self.period.start, self.period.end)
            && self.user_id.map_or(true, |id| sub.user_id == id)
            && self
                .service_name
                .as_deref()
                .map_or(true, |name| sub.service_name == name)
    }
}
