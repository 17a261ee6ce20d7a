use remra_core::job_schedulers::start_notification_dispatcher_job;
use remra_infra::setup_context;
use remra_infra::telemetry::{get_subscriber, init_subscriber};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("info".into());
    init_subscriber(subscriber);

    let context = setup_context().await?;
    let shutdown = CancellationToken::new();

    let dispatcher_job = start_notification_dispatcher_job(context, shutdown.clone());

    info!("Notification service started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down notification service...");

    shutdown.cancel();
    let _ = dispatcher_job.await;

    Ok(())
}
