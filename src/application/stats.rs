use crate::domain::access::{Caller, Capability};
use crate::domain::dispatch::TaxiOrder;
use crate::domain::ports::{AccountStoreRef, RecordStoreRef};
use crate::domain::review::{Review, ReviewStatus};
use crate::domain::task::{SubmissionStatus, TaskSubmission};
use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    pub total_users: usize,
    pub total_orders: usize,
    pub total_tasks_completed: usize,
    pub pending_reviews: usize,
}

/// Administrator counts, derived from the owning stores on every call.
///
/// The four reads run concurrently but are not one snapshot: a mutation
/// landing between them can show up in one count and not yet in another.
/// Each count on its own is exact at the time it was read.
#[derive(Clone)]
pub struct StatsAggregator {
    accounts: AccountStoreRef,
    orders: RecordStoreRef<TaxiOrder>,
    submissions: RecordStoreRef<TaskSubmission>,
    reviews: RecordStoreRef<Review>,
}

impl StatsAggregator {
    pub fn new(
        accounts: AccountStoreRef,
        orders: RecordStoreRef<TaxiOrder>,
        submissions: RecordStoreRef<TaskSubmission>,
        reviews: RecordStoreRef<Review>,
    ) -> Self {
        Self {
            accounts,
            orders,
            submissions,
            reviews,
        }
    }

    pub async fn snapshot(&self, caller: &Caller) -> Result<PlatformStats> {
        caller.require(Capability::ViewStats)?;
        let (accounts, orders, submissions, reviews) = tokio::try_join!(
            self.accounts.get_all(),
            self.orders.get_all(),
            self.submissions.get_all(),
            self.reviews.get_all(),
        )?;
        Ok(PlatformStats {
            total_users: accounts.len(),
            total_orders: orders.len(),
            total_tasks_completed: submissions
                .iter()
                .filter(|s| s.status == SubmissionStatus::Approved)
                .count(),
            pending_reviews: reviews
                .iter()
                .filter(|r| r.status == ReviewStatus::Pending)
                .count(),
        })
    }
}
