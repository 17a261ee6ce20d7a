use remra_core::job_schedulers::{start_due_reminders_job, start_outbox_relay_job};
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

    let scan_job = start_due_reminders_job(context.clone(), shutdown.clone());
    let relay_job = start_outbox_relay_job(context, shutdown.clone());

    info!("Reminder service started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down reminder service...");

    // Workers finish their in-flight tick before exiting
    shutdown.cancel();
    let _ = scan_job.await;
    let _ = relay_job.await;

    Ok(())
}
