use remra_domain::Reminder;
use remra_infra::Config;
use tracing::{error, info};

/// Deliver one fired reminder. With a configured webhook the snapshot is
/// POSTed there; otherwise delivery is the log line, which is what the
/// development setup runs with. Delivery is stateless, so a redelivered
/// message at worst repeats the notification.
pub async fn dispatch_reminder(reminder: &Reminder, config: &Config, client: &reqwest::Client) {
    match &config.notification_webhook_url {
        Some(url) => {
            if let Err(e) = client.post(url).json(reminder).send().await {
                error!(
                    "Error delivering reminder {} to webhook: {:?}",
                    reminder.id, e
                );
            }
        }
        None => {
            info!(
                "[NOTIFICATION] Sending reminder to user {}: {} ({})",
                reminder.user_id, reminder.title, reminder.description
            );
        }
    }
}
