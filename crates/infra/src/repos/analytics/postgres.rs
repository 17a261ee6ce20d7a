use super::{IAnalyticsRepo, ProjectionOutcome};
use chrono::{DateTime, Utc};
use remra_domain::{EventType, LifecycleEvent, UserStatistics, ID};
use sqlx::{types::Uuid, FromRow, PgPool};

pub struct PostgresAnalyticsRepo {
    pool: PgPool,
}

impl PostgresAnalyticsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserStatisticsRaw {
    user_id: Uuid,
    total_created: i64,
    total_completed: i64,
    total_deleted: i64,
    active: i64,
    completion_rate: f64,
    first_reminder_at: Option<DateTime<Utc>>,
    last_activity_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Into<UserStatistics> for UserStatisticsRaw {
    fn into(self) -> UserStatistics {
        UserStatistics {
            user_id: self.user_id.into(),
            total_created: self.total_created,
            total_completed: self.total_completed,
            total_deleted: self.total_deleted,
            active: self.active,
            completion_rate: self.completion_rate,
            first_reminder_at: self.first_reminder_at,
            last_activity_at: self.last_activity_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait::async_trait]
impl IAnalyticsRepo for PostgresAnalyticsRepo {
    async fn apply(&self, event: &LifecycleEvent) -> anyhow::Result<ProjectionOutcome> {
        let mut tx = self.pool.begin().await?;

        let already_processed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM analytics.processed_events WHERE event_id = $1)
            "#,
        )
        .bind(event.event_id.inner_ref())
        .fetch_one(&mut *tx)
        .await?;

        if already_processed {
            tx.commit().await?;
            return Ok(ProjectionOutcome::Duplicate);
        }

        let user_id = event.user_id.inner_ref();
        match event.event_type {
            EventType::Created => {
                sqlx::query(
                    r#"
                    INSERT INTO analytics.user_statistics
                        (user_id, total_created, active, first_reminder_at, last_activity_at)
                    VALUES ($1, 1, 1, $2, $2)
                    ON CONFLICT (user_id) DO UPDATE SET
                        total_created = user_statistics.total_created + 1,
                        active = user_statistics.active + 1,
                        first_reminder_at = LEAST(user_statistics.first_reminder_at, $2),
                        last_activity_at = $2,
                        completion_rate = ROUND(
                            (user_statistics.total_completed::DECIMAL
                                / (user_statistics.total_created + 1)) * 100, 2),
                        updated_at = NOW()
                    "#,
                )
                .bind(user_id)
                .bind(event.timestamp)
                .execute(&mut *tx)
                .await?;
            }
            EventType::NotificationSent => {
                sqlx::query(
                    r#"
                    UPDATE analytics.user_statistics SET
                        total_completed = total_completed + 1,
                        active = GREATEST(active - 1, 0),
                        last_activity_at = $2,
                        completion_rate = CASE WHEN total_created > 0
                            THEN ROUND(((total_completed + 1)::DECIMAL / total_created) * 100, 2)
                            ELSE 0 END,
                        updated_at = NOW()
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(event.timestamp)
                .execute(&mut *tx)
                .await?;
            }
            EventType::Deleted => {
                sqlx::query(
                    r#"
                    UPDATE analytics.user_statistics SET
                        total_deleted = total_deleted + 1,
                        active = GREATEST(active - 1, 0),
                        last_activity_at = $2,
                        updated_at = NOW()
                    WHERE user_id = $1
                    "#,
                )
                .bind(user_id)
                .bind(event.timestamp)
                .execute(&mut *tx)
                .await?;
            }
            // No counters change, but the event is still recorded below so
            // it is never reprocessed
            EventType::Updated | EventType::NotificationTrigger => {}
        }

        sqlx::query(
            r#"
            INSERT INTO analytics.processed_events (event_id) VALUES ($1)
            "#,
        )
        .bind(event.event_id.inner_ref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ProjectionOutcome::Applied)
    }

    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Option<UserStatistics>> {
        let raw = sqlx::query_as::<_, UserStatisticsRaw>(
            r#"
            SELECT * FROM analytics.user_statistics WHERE user_id = $1
            "#,
        )
        .bind(user_id.inner_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(raw.map(|raw| raw.into()))
    }
}
