use super::{IOutboxBatch, IOutboxRepo};
use chrono::{DateTime, Utc};
use remra_domain::{EventType, OutboxEvent, OutboxStatus, ID, MAX_RETRIES};
use sqlx::{types::Uuid, FromRow, PgPool, Postgres, Transaction};
use tracing::warn;

pub struct PostgresOutboxRepo {
    pool: PgPool,
}

impl PostgresOutboxRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OutboxEventRaw {
    id: Uuid,
    event_type: String,
    aggregate_id: Uuid,
    user_id: Uuid,
    payload: serde_json::Value,
    status: String,
    retry_count: i32,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl OutboxEventRaw {
    fn into_domain(self) -> Result<OutboxEvent, remra_domain::InvalidEventTypeError> {
        let event_type = self.event_type.parse::<EventType>()?;
        let status = self
            .status
            .parse::<OutboxStatus>()
            .unwrap_or(OutboxStatus::Pending);
        Ok(OutboxEvent {
            id: self.id.into(),
            event_type,
            aggregate_id: self.aggregate_id.into(),
            user_id: self.user_id.into(),
            payload: self.payload,
            status,
            retry_count: self.retry_count,
            created_at: self.created_at,
            processed_at: self.processed_at,
            last_error: self.last_error,
        })
    }
}

pub(crate) async fn insert_outbox_row<'e, E>(executor: E, row: &OutboxEvent) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO reminders_outbox
        (id, event_type, aggregate_id, user_id, payload, status, retry_count, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(row.id.inner_ref())
    .bind(row.event_type.as_str())
    .bind(row.aggregate_id.inner_ref())
    .bind(row.user_id.inner_ref())
    .bind(&row.payload)
    .bind(row.status.as_str())
    .bind(row.retry_count)
    .bind(row.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub struct PostgresOutboxBatch {
    tx: Transaction<'static, Postgres>,
    events: Vec<OutboxEvent>,
}

#[async_trait::async_trait]
impl IOutboxRepo for PostgresOutboxRepo {
    async fn claim_pending(&self, limit: i64) -> anyhow::Result<Box<dyn IOutboxBatch>> {
        let mut tx = self.pool.begin().await?;

        let raws = sqlx::query_as::<_, OutboxEventRaw>(
            r#"
            SELECT * FROM reminders_outbox
            WHERE status = 'PENDING' AND retry_count < $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(MAX_RETRIES)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut events = Vec::with_capacity(raws.len());
        for raw in raws {
            let id = raw.id;
            match raw.into_domain() {
                Ok(event) => events.push(event),
                Err(e) => {
                    // A row we cannot route is not retriable
                    warn!("Outbox row {} has an unroutable event type: {}", id, e);
                    sqlx::query(
                        r#"
                        UPDATE reminders_outbox
                        SET status = 'FAILED', last_error = $2
                        WHERE id = $1
                        "#,
                    )
                    .bind(id)
                    .bind(e.to_string())
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        Ok(Box::new(PostgresOutboxBatch { tx, events }))
    }

    async fn find_by_aggregate(&self, aggregate_id: &ID) -> anyhow::Result<Vec<OutboxEvent>> {
        let raws = sqlx::query_as::<_, OutboxEventRaw>(
            r#"
            SELECT * FROM reminders_outbox
            WHERE aggregate_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(aggregate_id.inner_ref())
        .fetch_all(&self.pool)
        .await?;

        raws.into_iter()
            .map(|raw| raw.into_domain().map_err(Into::into))
            .collect()
    }
}

#[async_trait::async_trait]
impl IOutboxBatch for PostgresOutboxBatch {
    fn events(&self) -> &[OutboxEvent] {
        &self.events
    }

    async fn mark_sent(&mut self, id: &ID, processed_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminders_outbox
            SET status = 'SENT', processed_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.inner_ref())
        .bind(processed_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn record_failure(&mut self, id: &ID, error: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminders_outbox
            SET retry_count = retry_count + 1,
                last_error = $2,
                status = CASE WHEN retry_count + 1 >= $3 THEN 'FAILED' ELSE status END
            WHERE id = $1
            "#,
        )
        .bind(id.inner_ref())
        .bind(error)
        .bind(MAX_RETRIES)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
