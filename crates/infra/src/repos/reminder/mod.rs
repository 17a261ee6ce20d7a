mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
pub use inmemory::InMemoryReminderRepo;
pub use postgres::PostgresReminderRepo;
use remra_domain::{OutboxEvent, Reminder, ReminderFilter, ID};

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    /// Insert the reminder and its `created` outbox row in one transaction
    async fn insert(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<()>;

    /// Persist the changed fields and the `updated` outbox row, guarded by
    /// `is_sent = false`. Returns `false` when the row is missing or
    /// already sent, in which case no outbox row is written either.
    async fn save(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<bool>;

    /// Delete the row and insert the `deleted` outbox row, guarded by
    /// `is_sent = false`. Same `false` contract as `save`.
    async fn delete(&self, user_id: &ID, id: &ID, outbox: &OutboxEvent) -> anyhow::Result<bool>;

    async fn find(&self, user_id: &ID, id: &ID) -> Option<Reminder>;

    async fn find_by_user(&self, user_id: &ID, filter: ReminderFilter) -> Vec<Reminder>;

    /// Reminders whose moment has arrived: `is_sent = false AND remind_at <= now`
    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>>;

    /// Flip `is_sent` and insert the `notification_trigger` +
    /// `notification_sent` outbox pair atomically. Returns `false` when
    /// another worker fired the reminder first; nothing is inserted then.
    async fn fire(
        &self,
        id: &ID,
        fired_at: DateTime<Utc>,
        trigger: &OutboxEvent,
        lifecycle: &OutboxEvent,
    ) -> anyhow::Result<bool>;
}
