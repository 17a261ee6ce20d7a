use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LIFECYCLE_TOPIC: &str = "reminder_lifecycle";
pub const DEFAULT_NOTIFICATION_TOPIC: &str = "notifications";
pub const ANALYTICS_CONSUMER_GROUP: &str = "analytics-service-group";
pub const NOTIFICATION_CONSUMER_GROUP: &str = "notification-service-group";

#[derive(Debug, Clone)]
pub struct Config {
    /// Stream carrying created/updated/deleted/notification_sent envelopes
    pub lifecycle_topic: String,
    /// Stream carrying raw reminder snapshots at fire time
    pub notification_topic: String,
    /// Tick of the due-time scan worker
    pub scan_interval: Duration,
    /// Tick of the outbox relay worker
    pub relay_interval: Duration,
    /// Maximum number of outbox rows claimed per relay tick
    pub outbox_batch_size: i64,
    /// Upper bound for a single stream publish
    pub publish_timeout: Duration,
    pub analytics_consumer_group: String,
    pub notification_consumer_group: String,
    /// When set, the notification dispatcher POSTs fired reminders here
    /// instead of only logging them
    pub notification_webhook_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        let lifecycle_topic = std::env::var("KAFKA_TOPIC_LIFECYCLE")
            .unwrap_or_else(|_| DEFAULT_LIFECYCLE_TOPIC.into());
        let notification_topic = std::env::var("KAFKA_TOPIC_NOTIFICATIONS")
            .unwrap_or_else(|_| DEFAULT_NOTIFICATION_TOPIC.into());

        let scan_interval = interval_from_env("WORKER_INTERVAL", Duration::from_secs(5));
        let relay_interval =
            interval_from_env("OUTBOX_RELAY_INTERVAL", Duration::from_millis(500));

        let default_batch_size = 50;
        let outbox_batch_size = match std::env::var("OUTBOX_BATCH_SIZE") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(size) if size > 0 => size,
                _ => {
                    warn!(
                        "The given OUTBOX_BATCH_SIZE: {} is not valid, falling back to the default: {}.",
                        raw, default_batch_size
                    );
                    default_batch_size
                }
            },
            Err(_) => default_batch_size,
        };

        Self {
            lifecycle_topic,
            notification_topic,
            scan_interval,
            relay_interval,
            outbox_batch_size,
            publish_timeout: Duration::from_secs(5),
            analytics_consumer_group: ANALYTICS_CONSUMER_GROUP.into(),
            notification_consumer_group: NOTIFICATION_CONSUMER_GROUP.into(),
            notification_webhook_url: std::env::var("NOTIFICATION_WEBHOOK_URL").ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn interval_from_env(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(raw) => match parse_interval(&raw) {
            Some(interval) => interval,
            None => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {:?}.",
                    key, raw, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Parses `500ms`, `5s`, `2m` or a plain number of seconds
fn parse_interval(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Some(millis) = raw.strip_suffix("ms") {
        return millis.parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = raw.strip_suffix('s') {
        return secs.parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(mins) = raw.strip_suffix('m') {
        return mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    raw.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_suffixes() {
        assert_eq!(parse_interval("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_interval("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_interval("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_interval("30"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_garbage_intervals() {
        assert_eq!(parse_interval("soon"), None);
        assert_eq!(parse_interval("5h30m"), None);
        assert_eq!(parse_interval(""), None);
    }
}
