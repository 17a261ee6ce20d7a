use crate::error::RemraError;
use crate::shared::usecase::UseCase;
use chrono::{DateTime, Utc};
use remra_domain::{LifecycleEvent, OutboxEvent, Reminder, ID, REMINDER_TITLE_MAX_LEN};
use remra_infra::RemraContext;

/// Creates a reminder and, in the same transaction, the `created` outbox
/// row that the relay will publish on the lifecycle stream.
#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub user_id: ID,
    pub title: String,
    pub description: String,
    pub remind_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    EmptyTitle,
    TitleTooLong,
    RemindAtInPast,
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
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for CreateReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateReminder";

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

        let reminder = Reminder::new(
            self.user_id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.remind_at,
            now,
        );

        let event = LifecycleEvent::created(&reminder, now);
        let outbox = OutboxEvent::lifecycle(&event).map_err(|_| UseCaseError::StorageError)?;

        ctx.repos
            .reminders
            .insert(&reminder, &outbox)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remra_domain::EventType;

    fn usecase(ctx: &RemraContext) -> CreateReminderUseCase {
        CreateReminderUseCase {
            user_id: ID::new(),
            title: "Dentist".into(),
            description: "Bring the referral".into(),
            remind_at: ctx.sys.now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn creates_reminder_with_matching_outbox_row() {
        let ctx = RemraContext::create_inmemory();

        let mut usecase = usecase(&ctx);
        let reminder = usecase.execute(&ctx).await.expect("creation to succeed");

        assert!(!reminder.is_sent);
        let stored = ctx.repos.reminders.find(&reminder.user_id, &reminder.id).await;
        assert_eq!(stored, Some(reminder.clone()));

        let outbox = ctx
            .repos
            .outbox
            .find_by_aggregate(&reminder.id)
            .await
            .unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].event_type, EventType::Created);
        assert_eq!(outbox[0].user_id, reminder.user_id);
    }

    #[tokio::test]
    async fn rejects_empty_title() {
        let ctx = RemraContext::create_inmemory();

        let mut usecase = CreateReminderUseCase {
            title: "   ".into(),
            ..usecase(&ctx)
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(res.unwrap_err(), UseCaseError::EmptyTitle);
    }

    #[tokio::test]
    async fn rejects_too_long_title() {
        let ctx = RemraContext::create_inmemory();

        let mut usecase = CreateReminderUseCase {
            title: "x".repeat(REMINDER_TITLE_MAX_LEN + 1),
            ..usecase(&ctx)
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(res.unwrap_err(), UseCaseError::TitleTooLong);
    }

    #[tokio::test]
    async fn rejects_remind_at_in_the_past() {
        let ctx = RemraContext::create_inmemory();

        let mut usecase = CreateReminderUseCase {
            remind_at: ctx.sys.now() - chrono::Duration::seconds(1),
            ..usecase(&ctx)
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(res.unwrap_err(), UseCaseError::RemindAtInPast);

        // The failed mutation must leave no trace
        let reminders = ctx
            .repos
            .reminders
            .find_by_user(&usecase.user_id, remra_domain::ReminderFilter::All)
            .await;
        assert!(reminders.is_empty());
    }
}
