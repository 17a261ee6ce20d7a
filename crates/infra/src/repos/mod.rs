mod analytics;
mod outbox;
mod reminder;

use analytics::{InMemoryAnalyticsRepo, PostgresAnalyticsRepo};
pub use analytics::{IAnalyticsRepo, ProjectionOutcome};
use outbox::{InMemoryOutboxRepo, PostgresOutboxRepo};
pub use outbox::{IOutboxBatch, IOutboxRepo};
use reminder::{InMemoryReminderRepo, PostgresReminderRepo};
pub use reminder::IReminderRepo;

use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct Repos {
    pub reminders: Arc<dyn IReminderRepo>,
    pub outbox: Arc<dyn IOutboxRepo>,
    pub analytics: Arc<dyn IAnalyticsRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("DB CHECKING CONNECTION ... [done]");

        Ok(Self {
            reminders: Arc::new(PostgresReminderRepo::new(pool.clone())),
            outbox: Arc::new(PostgresOutboxRepo::new(pool.clone())),
            analytics: Arc::new(PostgresAnalyticsRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        // The relay and the mutation paths see the same outbox rows, like
        // they share the table in Postgres
        let outbox_rows = Arc::new(Mutex::new(Vec::new()));
        Self {
            reminders: Arc::new(InMemoryReminderRepo::new(outbox_rows.clone())),
            outbox: Arc::new(InMemoryOutboxRepo::new(outbox_rows)),
            analytics: Arc::new(InMemoryAnalyticsRepo::new()),
        }
    }
}
