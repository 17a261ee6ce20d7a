use super::IReminderRepo;
use crate::repos::outbox::insert_outbox_row;
use chrono::{DateTime, Utc};
use remra_domain::{OutboxEvent, Reminder, ReminderFilter, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: String,
    remind_at: DateTime<Utc>,
    is_sent: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Into<Reminder> for ReminderRaw {
    fn into(self) -> Reminder {
        Reminder {
            id: self.id.into(),
            user_id: self.user_id.into(),
            title: self.title,
            description: self.description,
            remind_at: self.remind_at,
            is_sent: self.is_sent,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reminders
            (id, user_id, title, description, remind_at, is_sent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.user_id.inner_ref())
        .bind(&reminder.title)
        .bind(&reminder.description)
        .bind(reminder.remind_at)
        .bind(reminder.is_sent)
        .bind(reminder.created_at)
        .bind(reminder.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_outbox_row(&mut *tx, outbox).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"
            UPDATE reminders
            SET title = $3, description = $4, remind_at = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2 AND is_sent = FALSE
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.user_id.inner_ref())
        .bind(&reminder.title)
        .bind(&reminder.description)
        .bind(reminder.remind_at)
        .bind(reminder.updated_at)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_outbox_row(&mut *tx, outbox).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, user_id: &ID, id: &ID, outbox: &OutboxEvent) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"
            DELETE FROM reminders
            WHERE id = $1 AND user_id = $2 AND is_sent = FALSE
            "#,
        )
        .bind(id.inner_ref())
        .bind(user_id.inner_ref())
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_outbox_row(&mut *tx, outbox).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find(&self, user_id: &ID, id: &ID) -> Option<Reminder> {
        sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.inner_ref())
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .ok()
        .flatten()
        .map(|raw| raw.into())
    }

    async fn find_by_user(&self, user_id: &ID, filter: ReminderFilter) -> Vec<Reminder> {
        let query = match filter {
            ReminderFilter::Pending => {
                r#"
                SELECT * FROM reminders
                WHERE user_id = $1 AND is_sent = FALSE
                ORDER BY remind_at ASC
                "#
            }
            ReminderFilter::Sent => {
                r#"
                SELECT * FROM reminders
                WHERE user_id = $1 AND is_sent = TRUE
                ORDER BY remind_at DESC
                "#
            }
            ReminderFilter::All => {
                r#"
                SELECT * FROM reminders
                WHERE user_id = $1
                ORDER BY remind_at ASC
                "#
            }
        };

        sqlx::query_as::<_, ReminderRaw>(query)
            .bind(user_id.inner_ref())
            .fetch_all(&self.pool)
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|raw| raw.into())
            .collect()
    }

    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let raws = sqlx::query_as::<_, ReminderRaw>(
            r#"
            SELECT * FROM reminders
            WHERE is_sent = FALSE AND remind_at <= $1
            ORDER BY remind_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(raws.into_iter().map(|raw| raw.into()).collect())
    }

    async fn fire(
        &self,
        id: &ID,
        fired_at: DateTime<Utc>,
        trigger: &OutboxEvent,
        lifecycle: &OutboxEvent,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        // The guard makes firing at-most-once even with concurrent scanners
        let res = sqlx::query(
            r#"
            UPDATE reminders
            SET is_sent = TRUE, updated_at = $2
            WHERE id = $1 AND is_sent = FALSE
            "#,
        )
        .bind(id.inner_ref())
        .bind(fired_at)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_outbox_row(&mut *tx, trigger).await?;
        insert_outbox_row(&mut *tx, lifecycle).await?;

        tx.commit().await?;
        Ok(true)
    }
}
