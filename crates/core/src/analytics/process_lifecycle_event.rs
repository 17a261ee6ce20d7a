use crate::shared::usecase::UseCase;
use metrics::counter;
use remra_domain::LifecycleEvent;
use remra_infra::{ProjectionOutcome, RemraContext};
use tracing::debug;

/// Applies one lifecycle event to the per-user counters. The analytics
/// store runs the whole step in a single transaction keyed by `event_id`,
/// which makes redelivered and re-ordered events harmless.
#[derive(Debug)]
pub struct ProcessLifecycleEventUseCase {
    pub event: LifecycleEvent,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for ProcessLifecycleEventUseCase {
    type Response = ProjectionOutcome;

    type Error = UseCaseError;

    const NAME: &'static str = "ProcessLifecycleEvent";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        debug!(
            "Processing {} event {} for user {}",
            self.event.event_type, self.event.event_id, self.event.user_id
        );

        let outcome = ctx
            .repos
            .analytics
            .apply(&self.event)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        match outcome {
            ProjectionOutcome::Applied => {
                counter!("remra_analytics_events_processed_total").increment(1)
            }
            ProjectionOutcome::Duplicate => {
                counter!("remra_analytics_events_duplicate_total").increment(1)
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use remra_domain::{LifecycleEvent, Reminder, ID};

    fn reminder(user_id: &ID) -> Reminder {
        let now = Utc::now();
        Reminder::new(
            user_id.clone(),
            "Book flights".into(),
            "".into(),
            now + chrono::Duration::days(7),
            now,
        )
    }

    #[tokio::test]
    async fn redelivery_of_the_same_event_changes_nothing() {
        let ctx = RemraContext::create_inmemory();
        let user_id = ID::new();
        let event = LifecycleEvent::created(&reminder(&user_id), Utc::now());

        let first = ProcessLifecycleEventUseCase {
            event: event.clone(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(first, ProjectionOutcome::Applied);

        for _ in 0..3 {
            let outcome = ProcessLifecycleEventUseCase {
                event: event.clone(),
            }
            .execute(&ctx)
            .await
            .unwrap();
            assert_eq!(outcome, ProjectionOutcome::Duplicate);
        }

        let stats = ctx
            .repos
            .analytics
            .find_by_user(&user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.active, 1);
    }
}
