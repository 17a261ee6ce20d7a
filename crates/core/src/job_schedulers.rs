use crate::{
    analytics::ProcessLifecycleEventUseCase, notification::dispatch_reminder,
    outbox::RelayOutboxUseCase, reminder::FireDueRemindersUseCase, shared::usecase::execute,
};
use metrics::counter;
use remra_domain::{LifecycleEvent, Reminder};
use remra_infra::RemraContext;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Periodically turns elapsed reminders into outbox events
pub fn start_due_reminders_job(ctx: RemraContext, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Due-time scan worker started with interval {:?}",
            ctx.config.scan_interval
        );
        let mut interval = tokio::time::interval(ctx.config.scan_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stopping due-time scan worker...");
                    break;
                }
                _ = interval.tick() => {
                    let _ = execute(FireDueRemindersUseCase, &ctx).await;
                }
            }
        }
    })
}

/// Periodically drains PENDING outbox rows onto the streams
pub fn start_outbox_relay_job(ctx: RemraContext, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Outbox relay worker started with interval {:?}",
            ctx.config.relay_interval
        );
        let mut interval = tokio::time::interval(ctx.config.relay_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    // The in-flight batch, if any, already finished: the
                    // usecase runs to completion before this branch is taken
                    info!("Stopping outbox relay worker...");
                    break;
                }
                _ = interval.tick() => {
                    let batch_size = ctx.config.outbox_batch_size;
                    let _ = execute(RelayOutboxUseCase { batch_size }, &ctx).await;
                }
            }
        }
    })
}

/// Consumes the lifecycle stream and projects it into per-user statistics
pub fn start_lifecycle_projector_job(
    ctx: RemraContext,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let consumer = match ctx
            .stream
            .subscribe(&ctx.config.lifecycle_topic, &ctx.config.analytics_consumer_group)
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                error!("Failed to subscribe to the lifecycle stream: {:?}", e);
                return;
            }
        };
        info!(
            "Analytics projector started on topic {}",
            ctx.config.lifecycle_topic
        );

        loop {
            let fetched = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stopping analytics projector...");
                    break;
                }
                fetched = consumer.fetch() => fetched,
            };

            let msg = match fetched {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Error fetching from the lifecycle stream: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            match serde_json::from_slice::<LifecycleEvent>(&msg.payload) {
                Err(e) => {
                    // Poison skip: commit so the group does not stall on a
                    // payload that will never parse
                    counter!("remra_analytics_malformed_events_total").increment(1);
                    error!(
                        "Skipping malformed lifecycle payload: {:?} | payload: {}",
                        e,
                        String::from_utf8_lossy(&msg.payload)
                    );
                    if let Err(e) = consumer.commit(&msg).await {
                        error!("Error committing offset: {:?}", e);
                    }
                }
                Ok(event) => {
                    match execute(ProcessLifecycleEventUseCase { event }, &ctx).await {
                        Ok(_) => {
                            if let Err(e) = consumer.commit(&msg).await {
                                error!("Error committing offset: {:?}", e);
                            }
                        }
                        Err(e) => {
                            // Offset stays uncommitted so the event is
                            // redelivered once the group resumes
                            error!("Error processing lifecycle event: {:?}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    })
}

/// Consumes the notification stream and delivers fired reminders
pub fn start_notification_dispatcher_job(
    ctx: RemraContext,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let consumer = match ctx
            .stream
            .subscribe(
                &ctx.config.notification_topic,
                &ctx.config.notification_consumer_group,
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                error!("Failed to subscribe to the notification stream: {:?}", e);
                return;
            }
        };
        info!(
            "Notification dispatcher started on topic {}",
            ctx.config.notification_topic
        );
        let client = reqwest::Client::new();

        loop {
            let fetched = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stopping notification dispatcher...");
                    break;
                }
                fetched = consumer.fetch() => fetched,
            };

            let msg = match fetched {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Error fetching from the notification stream: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            match serde_json::from_slice::<Reminder>(&msg.payload) {
                Err(e) => {
                    error!(
                        "Failed to parse reminder: {:?} | payload: {}",
                        e,
                        String::from_utf8_lossy(&msg.payload)
                    );
                }
                Ok(reminder) => {
                    dispatch_reminder(&reminder, &ctx.config, &client).await;
                    counter!("remra_notifications_dispatched_total").increment(1);
                }
            }

            if let Err(e) = consumer.commit(&msg).await {
                error!("Error committing offset: {:?}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn workers_stop_on_cancellation() {
        let ctx = RemraContext::create_inmemory();
        let shutdown = CancellationToken::new();

        let jobs = vec![
            start_due_reminders_job(ctx.clone(), shutdown.clone()),
            start_outbox_relay_job(ctx.clone(), shutdown.clone()),
            start_lifecycle_projector_job(ctx.clone(), shutdown.clone()),
            start_notification_dispatcher_job(ctx.clone(), shutdown.clone()),
        ];

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        for job in jobs {
            tokio::time::timeout(Duration::from_secs(1), job)
                .await
                .expect("worker should stop after cancellation")
                .expect("worker should not panic");
        }
    }
}
