use crate::shared::usecase::UseCase;
use remra_domain::{Reminder, ReminderFilter, ID};
use remra_infra::RemraContext;

/// Lists a user's reminders: pending ones soonest-first, sent ones most
/// recent first.
#[derive(Debug)]
pub struct GetRemindersUseCase {
    pub user_id: ID,
    pub filter: ReminderFilter,
}

#[derive(Debug)]
pub enum UseCaseError {}

#[async_trait::async_trait]
impl UseCase for GetRemindersUseCase {
    type Response = Vec<Reminder>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetReminders";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        Ok(ctx
            .repos
            .reminders
            .find_by_user(&self.user_id, self.filter)
            .await)
    }
}
