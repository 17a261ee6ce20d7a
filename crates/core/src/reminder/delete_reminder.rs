use crate::error::RemraError;
use crate::shared::usecase::UseCase;
use remra_domain::{LifecycleEvent, OutboxEvent, ID};
use remra_infra::RemraContext;

/// Deletes a pending reminder and records the `deleted` event in the same
/// transaction. Sent reminders are terminal and cannot be deleted.
#[derive(Debug)]
pub struct DeleteReminderUseCase {
    pub user_id: ID,
    pub reminder_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFoundOrSent(ID),
    StorageError,
}

impl From<UseCaseError> for RemraError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFoundOrSent(reminder_id) => Self::Conflict(format!(
                "The reminder with id: {}, was not found or has already been sent.",
                reminder_id
            )),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait]
impl UseCase for DeleteReminderUseCase {
    type Response = ();

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteReminder";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let event = LifecycleEvent::deleted(&self.reminder_id, &self.user_id, now);
        let outbox = OutboxEvent::lifecycle(&event).map_err(|_| UseCaseError::StorageError)?;

        let deleted = ctx
            .repos
            .reminders
            .delete(&self.user_id, &self.reminder_id, &outbox)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        if !deleted {
            return Err(UseCaseError::NotFoundOrSent(self.reminder_id.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::create_reminder::CreateReminderUseCase;
    use remra_domain::{EventType, ReminderFilter};

    #[tokio::test]
    async fn deletes_pending_reminder_and_emits_deleted_event() {
        let ctx = RemraContext::create_inmemory();
        let mut create = CreateReminderUseCase {
            user_id: ID::new(),
            title: "Cancel subscription".into(),
            description: "".into(),
            remind_at: ctx.sys.now() + chrono::Duration::days(3),
        };
        let reminder = create.execute(&ctx).await.unwrap();

        let mut usecase = DeleteReminderUseCase {
            user_id: reminder.user_id.clone(),
            reminder_id: reminder.id.clone(),
        };
        usecase.execute(&ctx).await.expect("delete to succeed");

        assert!(ctx
            .repos
            .reminders
            .find_by_user(&reminder.user_id, ReminderFilter::All)
            .await
            .is_empty());

        let outbox = ctx.repos.outbox.find_by_aggregate(&reminder.id).await.unwrap();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[1].event_type, EventType::Deleted);
        // Deletion events carry no snapshot
        assert!(outbox[1].payload.get("payload").is_none());
    }

    #[tokio::test]
    async fn rejects_delete_of_unknown_reminder() {
        let ctx = RemraContext::create_inmemory();

        let mut usecase = DeleteReminderUseCase {
            user_id: ID::new(),
            reminder_id: ID::new(),
        };

        let res = usecase.execute(&ctx).await;
        assert_eq!(
            res.unwrap_err(),
            UseCaseError::NotFoundOrSent(usecase.reminder_id)
        );
    }
}
