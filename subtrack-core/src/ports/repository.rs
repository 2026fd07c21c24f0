//! Repository port - subscription table abstraction

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{CostFilter, Subscription};

/// Storage operations over the `subscriptions` table
///
/// Every method maps to a single statement, so each call is atomic on its
/// own. Implementations must not retry; backend failures are returned as
/// `Error::Storage` with the operation and target id in the context.
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new row
    fn insert(&self, sub: &Subscription) -> Result<()>;

    /// Point lookup by id
    fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>>;

    /// Overwrite service_name, price, start_date and end_date of the row
    /// with `sub.id`. The owner is left untouched. Returns the number of
    /// rows affected.
    fn update(&self, sub: &Subscription) -> Result<u64>;

    /// Delete by id, returning the number of rows affected
    fn delete(&self, id: Uuid) -> Result<u64>;

    /// All rows, most recent start first
    fn list(&self) -> Result<Vec<Subscription>>;

    /// Sum of `price` over rows matching the filter, 0 when none match
    fn total_cost(&self, filter: &CostFilter) -> Result<i64>;
}
