use crate::shared::usecase::UseCase;
use metrics::counter;
use remra_domain::{LifecycleEvent, OutboxEvent, Reminder};
use remra_infra::RemraContext;
use tracing::{error, info};

/// One tick of the due-time scan worker: find every reminder whose moment
/// has arrived and, per reminder, atomically insert the
/// `notification_trigger` + `notification_sent` outbox pair and flip
/// `is_sent`. A reminder that fails stays eligible for the next tick; a
/// reminder another worker fired concurrently is skipped.
#[derive(Debug)]
pub struct FireDueRemindersUseCase;

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for FireDueRemindersUseCase {
    type Response = usize;

    type Error = UseCaseError;

    const NAME: &'static str = "FireDueReminders";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let due = ctx
            .repos
            .reminders
            .find_due(now)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        if !due.is_empty() {
            info!("Found {} due reminders, creating notification events", due.len());
        }

        let mut fired = 0;
        for reminder in due {
            match fire_reminder(&reminder, ctx).await {
                Ok(true) => {
                    counter!("remra_reminders_fired_total").increment(1);
                    fired += 1;
                }
                Ok(false) => {
                    // Another scan worker got there first
                }
                Err(e) => {
                    error!("Error firing reminder {}: {:?}", reminder.id, e);
                }
            }
        }

        Ok(fired)
    }
}

async fn fire_reminder(reminder: &Reminder, ctx: &RemraContext) -> anyhow::Result<bool> {
    let now = ctx.sys.now();
    let trigger = OutboxEvent::notification_trigger(reminder, now)?;
    let lifecycle = OutboxEvent::lifecycle(&LifecycleEvent::notification_sent(reminder, now))?;

    ctx.repos
        .reminders
        .fire(&reminder.id, now, &trigger, &lifecycle)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use remra_domain::{EventType, ID};

    async fn insert_reminder(ctx: &RemraContext, remind_in_minutes: i64) -> Reminder {
        let now = ctx.sys.now();
        let reminder = Reminder::new(
            ID::new(),
            "Take out the bins".into(),
            "".into(),
            now + chrono::Duration::minutes(remind_in_minutes),
            now,
        );
        let outbox = OutboxEvent::lifecycle(&LifecycleEvent::created(&reminder, now)).unwrap();
        ctx.repos.reminders.insert(&reminder, &outbox).await.unwrap();
        reminder
    }

    #[tokio::test]
    async fn fires_due_reminders_exactly_once() {
        let ctx = RemraContext::create_inmemory();
        let due = insert_reminder(&ctx, -1).await;
        let not_due = insert_reminder(&ctx, 60).await;

        let fired = FireDueRemindersUseCase.execute(&ctx).await.unwrap();
        assert_eq!(fired, 1);

        let stored = ctx.repos.reminders.find(&due.user_id, &due.id).await.unwrap();
        assert!(stored.is_sent);
        let untouched = ctx
            .repos
            .reminders
            .find(&not_due.user_id, &not_due.id)
            .await
            .unwrap();
        assert!(!untouched.is_sent);

        // created + notification_trigger + notification_sent
        let outbox = ctx.repos.outbox.find_by_aggregate(&due.id).await.unwrap();
        let types: Vec<EventType> = outbox.iter().map(|row| row.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::Created,
                EventType::NotificationTrigger,
                EventType::NotificationSent
            ]
        );

        // The next tick must not fire it again
        let fired_again = FireDueRemindersUseCase.execute(&ctx).await.unwrap();
        assert_eq!(fired_again, 0);
        let outbox = ctx.repos.outbox.find_by_aggregate(&due.id).await.unwrap();
        assert_eq!(outbox.len(), 3);
    }

    #[tokio::test]
    async fn catches_up_on_everything_past_due() {
        let ctx = RemraContext::create_inmemory();
        for minutes in [-1, -60, -60 * 24] {
            insert_reminder(&ctx, minutes).await;
        }

        let fired = FireDueRemindersUseCase.execute(&ctx).await.unwrap();
        assert_eq!(fired, 3);
    }
}
