mod inmemory;
mod postgres;

pub use inmemory::InMemoryAnalyticsRepo;
pub use postgres::PostgresAnalyticsRepo;
use remra_domain::{LifecycleEvent, UserStatistics, ID};

/// Result of applying one lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Applied,
    /// The `event_id` had already been processed; nothing changed
    Duplicate,
}

#[async_trait::async_trait]
pub trait IAnalyticsRepo: Send + Sync {
    /// Apply one lifecycle event to the per-user counters inside a single
    /// transaction keyed by `event_id`: duplicate check, counter dispatch,
    /// completion-rate recompute and the processed-events insert all
    /// commit together or not at all.
    async fn apply(&self, event: &LifecycleEvent) -> anyhow::Result<ProjectionOutcome>;

    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Option<UserStatistics>>;
}
