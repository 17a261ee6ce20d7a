use crate::error::RemraError;
use crate::shared::usecase::UseCase;
use chrono::{DateTime, Utc};
use remra_domain::{LifecycleEvent, OutboxEvent, Reminder, ID, REMINDER_TITLE_MAX_LEN};
use remra_infra::RemraContext;

/// Rewrites a pending reminder. A reminder that has already been sent is
/// terminal, so the update is rejected without producing an event.
#[derive(Debug)]
pub struct UpdateReminderUseCase {
    pub user_id: ID,
    pub reminder_id: ID,
    pub title: String,
    pub description: String,
    pub remind_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    EmptyTitle,
    TitleTooLong,
    RemindAtInPast,
    NotFoundOrSent(ID),
    StorageError,
}

impl From<UseCaseError> for RemraError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::EmptyTitle => Self::BadClientData("The title cannot be empty".into()),
            UseCaseError::TitleTooLong => Self::BadClientData(format!(
                "The title cannot be longer than {} characters",
                REMINDER_TITLE_MAX_LEN
            )),
            UseCaseError::RemindAtInPast => {
                Self::BadClientData("remind_at must be in the future".into())
            }
            UseCaseError::NotFoundOrSent(reminder_id) => Self::Conflict(format!(
                "The reminder with id: {}, was not found or has already been sent.",
                reminder_id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for UpdateReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateReminder";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        if self.title.trim().is_empty() {
            return Err(UseCaseError::EmptyTitle);
        }
        if self.title.len() > REMINDER_TITLE_MAX_LEN {
            return Err(UseCaseError::TitleTooLong);
        }

        let now = ctx.sys.now();
        if self.remind_at <= now {
            return Err(UseCaseError::RemindAtInPast);
        }

        let mut reminder = match ctx.repos.reminders.find(&self.user_id, &self.reminder_id).await {
            Some(reminder) if !reminder.is_sent => reminder,
            _ => return Err(UseCaseError::NotFoundOrSent(self.reminder_id.clone())),
        };

        reminder.title = self.title.clone();
        reminder.description = self.description.clone();
        reminder.remind_at = self.remind_at;
        reminder.updated_at = now;

        let event = LifecycleEvent::updated(&reminder, now);
        let outbox = OutboxEvent::lifecycle(&event).map_err(|_| UseCaseError::StorageError)?;

        let saved = ctx
            .repos
            .reminders
            .save(&reminder, &outbox)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        // A concurrent delete or firing can win the row lock between the
        // find and the save
        if !saved {
            return Err(UseCaseError::NotFoundOrSent(self.reminder_id.clone()));
        }

        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::create_reminder::CreateReminderUseCase;
    use remra_domain::EventType;

    struct TestContext {
        ctx: RemraContext,
        reminder: Reminder,
    }

    async fn setup() -> TestContext {
        let ctx = RemraContext::create_inmemory();
        let mut usecase = CreateReminderUseCase {
            user_id: ID::new(),
            title: "Water plants".into(),
            description: "".into(),
            remind_at: ctx.sys.now() + chrono::Duration::hours(2),
        };
        let reminder = usecase.execute(&ctx).await.unwrap();
        TestContext { ctx, reminder }
    }

    #[tokio::test]
    async fn updates_pending_reminder_and_appends_outbox_row() {
        let TestContext { ctx, reminder } = setup().await;

        let mut usecase = UpdateReminderUseCase {
            user_id: reminder.user_id.clone(),
            reminder_id: reminder.id.clone(),
            title: "Water the plants".into(),
            description: "Also the balcony ones".into(),
            remind_at: reminder.remind_at + chrono::Duration::hours(1),
        };

        let updated = usecase.execute(&ctx).await.expect("update to succeed");
        assert_eq!(updated.title, "Water the plants");
        assert!(updated.updated_at >= reminder.updated_at);

        let outbox = ctx.repos.outbox.find_by_aggregate(&reminder.id).await.unwrap();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[1].event_type, EventType::Updated);
    }

    #[tokio::test]
    async fn rejects_update_of_unknown_reminder() {
        let TestContext { ctx, reminder } = setup().await;

        let mut usecase = UpdateReminderUseCase {
            user_id: reminder.user_id.clone(),
            reminder_id: ID::new(),
            title: "Anything".into(),
            description: "".into(),
            remind_at: ctx.sys.now() + chrono::Duration::hours(1),
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(
            res.unwrap_err(),
            UseCaseError::NotFoundOrSent(usecase.reminder_id)
        );
    }

    #[tokio::test]
    async fn rejects_update_for_foreign_user() {
        let TestContext { ctx, reminder } = setup().await;

        let mut usecase = UpdateReminderUseCase {
            user_id: ID::new(),
            reminder_id: reminder.id.clone(),
            title: "Hijack".into(),
            description: "".into(),
            remind_at: ctx.sys.now() + chrono::Duration::hours(1),
        };

        assert!(usecase.execute(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn rejects_update_after_send_without_new_outbox_row() {
        let TestContext { ctx, reminder } = setup().await;

        // Fire the reminder the way the scan worker does
        let now = ctx.sys.now();
        let trigger = OutboxEvent::notification_trigger(&reminder, now).unwrap();
        let lifecycle =
            OutboxEvent::lifecycle(&LifecycleEvent::notification_sent(&reminder, now)).unwrap();
        assert!(ctx
            .repos
            .reminders
            .fire(&reminder.id, now, &trigger, &lifecycle)
            .await
            .unwrap());

        let rows_before = ctx.repos.outbox.find_by_aggregate(&reminder.id).await.unwrap();

        let mut usecase = UpdateReminderUseCase {
            user_id: reminder.user_id.clone(),
            reminder_id: reminder.id.clone(),
            title: "Too late".into(),
            description: "".into(),
            remind_at: ctx.sys.now() + chrono::Duration::hours(1),
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(
            res.unwrap_err(),
            UseCaseError::NotFoundOrSent(reminder.id.clone())
        );

        let rows_after = ctx.repos.outbox.find_by_aggregate(&reminder.id).await.unwrap();
        assert_eq!(rows_before.len(), rows_after.len());
    }
}
