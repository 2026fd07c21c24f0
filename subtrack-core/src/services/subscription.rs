//! Subscription service - CRUD and cost aggregation over the repository port

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{CostFilter, MonthYear, NewSubscription, Period, Subscription};
use crate::ports::{EventLog, LogEvent, SubscriptionRepository};

/// The subscription store
///
/// Stateless apart from its two handles, so one instance can serve
/// concurrent callers. Each operation issues at most one repository call and
/// never retries.
pub struct SubscriptionService {
    repository: Arc<dyn SubscriptionRepository>,
    log: Arc<dyn EventLog>,
}

impl SubscriptionService {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, log: Arc<dyn EventLog>) -> Self {
        Self { repository, log }
    }

    /// Persist a new subscription and return its generated id
    pub fn create(&self, input: &NewSubscription) -> Result<Uuid> {
        let (start_date, end_date) = input
            .parse_period()
            .map_err(|e| self.failed("create", None, e))?;

        let id = Uuid::new_v4();
        self.log.record(
            LogEvent::debug("creating_subscription")
                .with_operation("create")
                .with_subscription(id)
                .with_details(json!({
                    "user_id": input.user_id,
                    "service_name": input.service_name,
                })),
        );

        let sub = Subscription::from_input(id, input, start_date, end_date);
        self.repository
            .insert(&sub)
            .map_err(|e| self.failed("create", Some(id), e))?;

        self.log.record(
            LogEvent::info("subscription_created")
                .with_operation("create")
                .with_subscription(id),
        );
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<Subscription> {
        self.log.record(
            LogEvent::debug("getting_subscription")
                .with_operation("get")
                .with_subscription(id),
        );

        let sub = self
            .repository
            .find_by_id(id)
            .map_err(|e| self.failed("get", Some(id), e))?
            .ok_or_else(|| self.failed("get", Some(id), Error::NotFound(id)))?;

        self.log.record(
            LogEvent::debug("subscription_retrieved")
                .with_operation("get")
                .with_subscription(id),
        );
        Ok(sub)
    }

    /// Replace service name, price and period of an existing subscription
    ///
    /// The owner recorded at creation is kept even if `input.user_id` differs.
    pub fn update(&self, id: Uuid, input: &NewSubscription) -> Result<()> {
        let (start_date, end_date) = input
            .parse_period()
            .map_err(|e| self.failed("update", Some(id), e))?;

        self.log.record(
            LogEvent::debug("updating_subscription")
                .with_operation("update")
                .with_subscription(id)
                .with_details(json!({
                    "service_name": input.service_name,
                    "price": input.price,
                    "start_date": input.start_date,
                    "end_date": input.end_date,
                })),
        );

        let sub = Subscription::from_input(id, input, start_date, end_date);
        let affected = self
            .repository
            .update(&sub)
            .map_err(|e| self.failed("update", Some(id), e))?;

        if affected == 0 {
            return Err(self.failed("update", Some(id), Error::NotFound(id)));
        }

        self.log.record(
            LogEvent::info("subscription_updated")
                .with_operation("update")
                .with_subscription(id)
                .with_details(json!({ "rows_affected": affected })),
        );
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.log.record(
            LogEvent::debug("deleting_subscription")
                .with_operation("delete")
                .with_subscription(id),
        );

        let affected = self
            .repository
            .delete(id)
            .map_err(|e| self.failed("delete", Some(id), e))?;

        if affected == 0 {
            return Err(self.failed("delete", Some(id), Error::NotFound(id)));
        }

        self.log.record(
            LogEvent::info("subscription_deleted")
                .with_operation("delete")
                .with_subscription(id)
                .with_details(json!({ "rows_affected": affected })),
        );
        Ok(())
    }

    /// All subscriptions, most recent start first
    pub fn list(&self) -> Result<Vec<Subscription>> {
        self.log
            .record(LogEvent::debug("listing_subscriptions").with_operation("list"));

        let subscriptions = self
            .repository
            .list()
            .map_err(|e| self.failed("list", None, e))?;

        self.log.record(
            LogEvent::info("subscriptions_listed")
                .with_operation("list")
                .with_details(json!({ "count": subscriptions.len() })),
        );
        Ok(subscriptions)
    }

    /// Sum of prices of subscriptions active at any point in the period
    ///
    /// `period_end` defaults to `12-2100`. A nil `user_id` or empty
    /// `service_name` disables that filter.
    pub fn total_cost(
        &self,
        user_id: Option<Uuid>,
        service_name: Option<&str>,
        period_start: &str,
        period_end: Option<&str>,
    ) -> Result<i64> {
        let filter = self
            .cost_filter(user_id, service_name, period_start, period_end)
            .map_err(|e| self.failed("total_cost", None, e))?;

        self.log.record(
            LogEvent::debug("calculating_total_cost")
                .with_operation("total_cost")
                .with_details(json!(filter)),
        );

        let total = self
            .repository
            .total_cost(&filter)
            .map_err(|e| self.failed("total_cost", None, e))?;

        self.log.record(
            LogEvent::info("total_cost_calculated")
                .with_operation("total_cost")
                .with_details(json!({ "total": total })),
        );
        Ok(total)
    }

    fn cost_filter(
        &self,
        user_id: Option<Uuid>,
        service_name: Option<&str>,
        period_start: &str,
        period_end: Option<&str>,
    ) -> Result<CostFilter> {
        let start: MonthYear = period_start
            .parse()
            .map_err(|_| Error::invalid_date("period_start", period_start))?;
        let end = match period_end {
            None | Some("") => MonthYear::FAR_FUTURE,
            Some(s) => s.parse().map_err(|_| Error::invalid_date("period_end", s))?,
        };

        Ok(CostFilter::new(Period { start, end })
            .with_user_id(user_id)
            .with_service_name(service_name))
    }

    /// Record a failed operation and hand the error back unchanged
    fn failed(&self, operation: &str, id: Option<Uuid>, err: Error) -> Error {
        let event = match &err {
            Error::NotFound(_) => LogEvent::warn("subscription_not_found"),
            Error::InvalidDateFormat { field, value } => LogEvent::error("invalid_date_format")
                .with_details(json!({ "field": field, "value": value })),
            _ => LogEvent::error(format!("{}_failed", operation)),
        };

        let mut event = event.with_operation(operation).with_error(&err);
        if let Some(id) = id {
            event = event.with_subscription(id);
        }
        self.log.record(event);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;
    use crate::domain::result::ErrorKind;
    use crate::ports::{LogLevel, MemoryEventLog};

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        log: Arc<MemoryEventLog>,
        service: SubscriptionService,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let log = Arc::new(MemoryEventLog::new());
        let service = SubscriptionService::new(repo.clone(), log.clone());
        Fixture { repo, log, service }
    }

    fn input(name: &str, price: u32, start: &str, end: Option<&str>) -> NewSubscription {
        let sub = NewSubscription::new(name, price, Uuid::new_v4(), start);
        match end {
            Some(end) => sub.with_end_date(end),
            None => sub,
        }
    }

    #[test]
    fn test_create_then_get_round_trips() {
        let f = fixture();
        let new = input("Yandex Plus", 400, "07-2025", Some("12-2025"));
        let id = f.service.create(&new).unwrap();

        let sub = f.service.get(id).unwrap();
        assert_eq!(sub.id, id);
        assert_eq!(sub.user_id, new.user_id);
        assert_eq!(sub.service_name, new.service_name);
        assert_eq!(sub.price, new.price);
        assert_eq!(sub.start_date.to_string(), "07-2025");
        assert_eq!(sub.end_date.map(|d| d.to_string()).as_deref(), Some("12-2025"));
    }

    #[test]
    fn test_create_generates_distinct_ids() {
        let f = fixture();
        let new = input("Netflix", 999, "01-2024", None);
        let a = f.service.create(&new).unwrap();
        let b = f.service.create(&new).unwrap();
        assert_ne!(a, b);
        assert_eq!(f.repo.len(), 2);
    }

    #[test]
    fn test_empty_end_date_is_stored_as_absent() {
        let f = fixture();
        let id = f
            .service
            .create(&input("Spotify", 169, "06-2025", Some("")))
            .unwrap();
        assert_eq!(f.service.get(id).unwrap().end_date, None);
    }

    #[test]
    fn test_invalid_dates_never_reach_storage() {
        let f = fixture();

        let err = f
            .service
            .create(&input("Bad", 1, "2025-07", None))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateFormat);

        let err = f
            .service
            .create(&input("Bad", 1, "07-2025", Some("13-2025")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateFormat);

        let err = f
            .service
            .update(Uuid::new_v4(), &input("Bad", 1, "7-2025", None))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateFormat);

        let err = f
            .service
            .total_cost(None, None, "2024", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateFormat);

        let err = f
            .service
            .total_cost(None, None, "01-2024", Some("01/2025"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDateFormat);

        assert_eq!(f.repo.calls(), 0);
    }

    #[test]
    fn test_missing_id_is_not_found() {
        let f = fixture();
        let id = Uuid::new_v4();

        assert_eq!(f.service.get(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            f.service
                .update(id, &input("X", 1, "01-2024", None))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(f.service.delete(id).unwrap_err().kind(), ErrorKind::NotFound);

        let warnings = f.log.at_level(LogLevel::Warn);
        assert_eq!(warnings.len(), 3);
        assert!(warnings
            .iter()
            .all(|e| e.subscription_id.as_deref() == Some(id.to_string().as_str())));
    }

    #[test]
    fn test_update_replaces_all_fields() {
        let f = fixture();
        let original = input("Netflix", 999, "01-2024", Some("12-2024"));
        let id = f.service.create(&original).unwrap();

        let replacement = NewSubscription {
            user_id: Uuid::new_v4(),
            ..input("Netflix Basic", 599, "03-2024", None)
        };
        f.service.update(id, &replacement).unwrap();

        let sub = f.service.get(id).unwrap();
        assert_eq!(sub.service_name, "Netflix Basic");
        assert_eq!(sub.price, 599);
        assert_eq!(sub.start_date.to_string(), "03-2024");
        assert_eq!(sub.end_date, None);
        // Ownership is not reassigned by update
        assert_eq!(sub.user_id, original.user_id);
    }

    #[test]
    fn test_delete_removes_record() {
        let f = fixture();
        let id = f
            .service
            .create(&input("Kinopoisk", 299, "02-2025", None))
            .unwrap();

        f.service.delete(id).unwrap();
        assert_eq!(f.service.get(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(f.service.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_by_start_descending() {
        let f = fixture();
        for start in ["01-2024", "06-2025", "03-2020"] {
            f.service.create(&input("S", 1, start, None)).unwrap();
        }

        let starts: Vec<String> = f
            .service
            .list()
            .unwrap()
            .iter()
            .map(|s| s.start_date.to_string())
            .collect();
        assert_eq!(starts, vec!["06-2025", "01-2024", "03-2020"]);
    }

    #[test]
    fn test_total_cost_overlap_semantics() {
        let f = fixture();
        assert_eq!(f.service.total_cost(None, None, "01-2024", None).unwrap(), 0);

        f.service
            .create(&input("A", 100, "01-2024", Some("12-2024")))
            .unwrap();
        f.service.create(&input("B", 200, "06-2024", None)).unwrap();

        assert_eq!(
            f.service
                .total_cost(None, None, "03-2024", Some("03-2024"))
                .unwrap(),
            100
        );
        assert_eq!(
            f.service
                .total_cost(None, None, "06-2024", Some("06-2024"))
                .unwrap(),
            300
        );
        assert_eq!(
            f.service
                .total_cost(None, None, "01-2025", Some("12-2100"))
                .unwrap(),
            200
        );
        // Omitted period end behaves like 12-2100
        assert_eq!(f.service.total_cost(None, None, "01-2025", None).unwrap(), 200);
    }

    #[test]
    fn test_total_cost_filters() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let mine = NewSubscription::new("Netflix", 999, owner, "01-2024");
        let also_mine = NewSubscription::new("Spotify", 169, owner, "01-2024");
        f.service.create(&mine).unwrap();
        f.service.create(&also_mine).unwrap();
        f.service.create(&input("Netflix", 999, "01-2024", None)).unwrap();

        let total = |user: Option<Uuid>, name: Option<&str>| {
            f.service.total_cost(user, name, "01-2024", None).unwrap()
        };
        assert_eq!(total(None, None), 999 + 169 + 999);
        assert_eq!(total(Some(owner), None), 999 + 169);
        assert_eq!(total(None, Some("Netflix")), 999 * 2);
        assert_eq!(total(Some(owner), Some("Netflix")), 999);
        assert_eq!(total(Some(Uuid::nil()), Some("")), 999 + 169 + 999);
    }

    #[test]
    fn test_storage_failure_is_surfaced_and_logged() {
        let f = fixture();
        f.repo.fail_next("disk full");

        let err = f
            .service
            .create(&input("Netflix", 999, "01-2024", None))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);

        let errors = f.log.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "create_failed");
        assert!(errors[0]
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("disk full"));

        // Nothing was persisted, and the next call goes through
        assert_eq!(f.repo.len(), 0);
        assert!(f.service.list().unwrap().is_empty());
    }

    #[test]
    fn test_successful_operations_are_logged() {
        let f = fixture();
        let id = f
            .service
            .create(&input("Netflix", 999, "01-2024", None))
            .unwrap();
        f.service.delete(id).unwrap();

        let events: Vec<String> = f
            .log
            .at_level(LogLevel::Info)
            .into_iter()
            .map(|e| e.event)
            .collect();
        assert_eq!(events, vec!["subscription_created", "subscription_deleted"]);
    }
}
