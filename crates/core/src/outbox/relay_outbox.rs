use crate::shared::usecase::UseCase;
use metrics::counter;
use remra_domain::EventType;
use remra_infra::RemraContext;
use tracing::{debug, info, warn};

/// One tick of the outbox relay: claim a batch of PENDING rows, publish
/// each to its stream keyed by `user_id`, and record the outcome. The
/// claim transaction stays open until the whole batch is done, so
/// concurrent relays work disjoint batches and a crash mid-batch leaves
/// every row PENDING for the next tick.
#[derive(Debug)]
pub struct RelayOutboxUseCase {
    pub batch_size: i64,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

#[derive(Debug)]
pub struct RelayReport {
    pub claimed: usize,
    pub published: usize,
    pub failed: usize,
}

#[async_trait::async_trait]
impl UseCase for RelayOutboxUseCase {
    type Response = RelayReport;

    type Error = UseCaseError;

    const NAME: &'static str = "RelayOutbox";

    async fn execute(&mut self, ctx: &RemraContext) -> Result<Self::Response, Self::Error> {
        let mut batch = ctx
            .repos
            .outbox
            .claim_pending(self.batch_size)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let events = batch.events().to_vec();
        if !events.is_empty() {
            info!("Relaying {} outbox events", events.len());
        }

        let mut published = 0;
        let mut failed = 0;
        for event in &events {
            let topic = match event.event_type {
                EventType::NotificationTrigger => &ctx.config.notification_topic,
                _ => &ctx.config.lifecycle_topic,
            };
            let payload =
                serde_json::to_vec(&event.payload).map_err(|_| UseCaseError::StorageError)?;

            match ctx
                .stream
                .publish(topic, &event.user_id.as_string(), &payload)
                .await
            {
                Ok(()) => {
                    batch
                        .mark_sent(&event.id, ctx.sys.now())
                        .await
                        .map_err(|_| UseCaseError::StorageError)?;
                    counter!("remra_outbox_published_total").increment(1);
                    debug!(
                        "Sent {} event {} for reminder {} to {}",
                        event.event_type, event.id, event.aggregate_id, topic
                    );
                    published += 1;
                }
                Err(e) => {
                    warn!("Error publishing outbox event {}: {:?}", event.id, e);
                    batch
                        .record_failure(&event.id, &e.to_string())
                        .await
                        .map_err(|_| UseCaseError::StorageError)?;
                    counter!("remra_outbox_publish_failures_total").increment(1);
                    failed += 1;
                }
            }
        }

        batch.commit().await.map_err(|_| UseCaseError::StorageError)?;

        Ok(RelayReport {
            claimed: events.len(),
            published,
            failed,
        })
    }
}
