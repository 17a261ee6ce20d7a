mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
pub use inmemory::InMemoryOutboxRepo;
pub use postgres::PostgresOutboxRepo;
pub(crate) use postgres::insert_outbox_row;
use remra_domain::{OutboxEvent, ID};

#[async_trait::async_trait]
pub trait IOutboxRepo: Send + Sync {
    /// Claim up to `limit` publishable rows (`PENDING`, retries left) in
    /// `created_at` order with skip-locked semantics. The claim stays open
    /// until the batch commits, so concurrent relay workers get disjoint
    /// batches and a crash mid-batch leaves every row `PENDING`.
    async fn claim_pending(&self, limit: i64) -> anyhow::Result<Box<dyn IOutboxBatch>>;

    /// All rows for one aggregate in relay order. Operator visibility.
    async fn find_by_aggregate(&self, aggregate_id: &ID) -> anyhow::Result<Vec<OutboxEvent>>;
}

#[async_trait::async_trait]
pub trait IOutboxBatch: Send {
    fn events(&self) -> &[OutboxEvent];

    async fn mark_sent(&mut self, id: &ID, processed_at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Advance `retry_count`, store the error, and flip the row to FAILED
    /// once the count reaches `MAX_RETRIES`
    async fn record_failure(&mut self, id: &ID, error: &str) -> anyhow::Result<()>;

    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
}
