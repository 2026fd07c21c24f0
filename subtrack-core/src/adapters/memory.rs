//! In-memory repository for service tests
//!
//! Mirrors the DuckDB adapter's observable behavior: list ordering, the
//! owner-preserving update, and the overlap filter for cost totals. It also
//! counts calls and can be told to fail the next one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{CostFilter, Subscription};
use crate::ports::SubscriptionRepository;

#[derive(Default)]
pub struct InMemoryRepository {
    rows: Mutex<Vec<Subscription>>,
    calls: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored rows, without counting as a call
    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or_default()
    }

    /// Make the next call return a storage error with this message
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(message.to_string());
        }
    }

    fn begin(&self, operation: &str) -> Result<std::sync::MutexGuard<'_, Vec<Subscription>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let injected = self.fail_next.lock().ok().and_then(|mut slot| slot.take());
        if let Some(message) = injected {
            return Err(Error::storage_msg(operation, message));
        }
        self.rows
            .lock()
            .map_err(|e| Error::storage_msg(operation, format!("lock poisoned: {}", e)))
    }
}

impl SubscriptionRepository for InMemoryRepository {
    fn insert(&self, sub: &Subscription) -> Result<()> {
        let mut rows = self.begin("insert subscription")?;
        if rows.iter().any(|row| row.id == sub.id) {
            return Err(Error::storage_msg(
                format!("insert subscription {}", sub.id),
                "duplicate key",
            ));
        }
        rows.push(sub.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>> {
        let rows = self.begin("get subscription")?;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    fn update(&self, sub: &Subscription) -> Result<u64> {
        let mut rows = self.begin("update subscription")?;
        match rows.iter_mut().find(|row| row.id == sub.id) {
            Some(row) => {
                row.service_name = sub.service_name.clone();
                row.price = sub.price;
                row.start_date = sub.start_date;
                row.end_date = sub.end_date;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete(&self, id: Uuid) -> Result<u64> {
        let mut rows = self.begin("delete subscription")?;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok((before - rows.len()) as u64)
    }

    fn list(&self) -> Result<Vec<Subscription>> {
        let rows = self.begin("list subscriptions")?;
        let mut out = rows.clone();
        out.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(out)
    }

    fn total_cost(&self, filter: &CostFilter) -> Result<i64> {
        let rows = self.begin("calculate total cost")?;
        Ok(rows
            .iter()
            .filter(|row| filter.matches(row))
            .map(|row| i64::from(row.price))
            .sum())
    }
}
