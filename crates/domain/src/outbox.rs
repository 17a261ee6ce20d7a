use crate::{
    event::{EventType, LifecycleEvent},
    reminder::Reminder,
    shared::entity::{Entity, ID},
};
use chrono::{DateTime, Utc};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// A row stays claimable until it has been published or has failed this
/// many times, after which it becomes `FAILED` and needs an operator.
pub const MAX_RETRIES: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

impl Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InvalidOutboxStatusError {
    #[error("unknown outbox status: {0}")]
    Unknown(String),
}

impl FromStr for OutboxStatus {
    type Err = InvalidOutboxStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            _ => Err(InvalidOutboxStatusError::Unknown(s.to_string())),
        }
    }
}

/// One to-be-published event, written in the same database transaction as
/// the state change it describes. The relay worker is the only reader of
/// PENDING rows and the only writer of the SENT/FAILED transitions.
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: ID,
    pub event_type: EventType,
    pub aggregate_id: ID,
    pub user_id: ID,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl OutboxEvent {
    fn new(
        event_type: EventType,
        aggregate_id: ID,
        user_id: ID,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ID::new(),
            event_type,
            aggregate_id,
            user_id,
            payload,
            status: OutboxStatus::Pending,
            retry_count: 0,
            created_at,
            processed_at: None,
            last_error: None,
        }
    }

    /// Row carrying a lifecycle envelope, destined for the lifecycle stream
    pub fn lifecycle(event: &LifecycleEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            event.event_type,
            event.reminder_id.clone(),
            event.user_id.clone(),
            serde_json::to_value(event)?,
            event.timestamp,
        ))
    }

    /// Row carrying a raw reminder snapshot, destined for the notification
    /// stream
    pub fn notification_trigger(
        reminder: &Reminder,
        created_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            EventType::NotificationTrigger,
            reminder.id.clone(),
            reminder.user_id.clone(),
            serde_json::to_value(reminder)?,
            created_at,
        ))
    }
}

impl Entity for OutboxEvent {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> Reminder {
        let now = Utc::now();
        Reminder::new(
            ID::new(),
            "Pay rent".into(),
            "First of the month".into(),
            now + chrono::Duration::days(1),
            now,
        )
    }

    #[test]
    fn lifecycle_row_embeds_the_full_envelope() {
        let r = reminder();
        let event = LifecycleEvent::created(&r, Utc::now());
        let row = OutboxEvent::lifecycle(&event).unwrap();

        assert_eq!(row.event_type, EventType::Created);
        assert_eq!(row.aggregate_id, r.id);
        assert_eq!(row.user_id, r.user_id);
        assert_eq!(row.status, OutboxStatus::Pending);
        assert_eq!(row.retry_count, 0);
        assert_eq!(row.payload["event_id"], event.event_id.as_string());
    }

    #[test]
    fn notification_trigger_row_carries_the_raw_snapshot() {
        let r = reminder();
        let row = OutboxEvent::notification_trigger(&r, Utc::now()).unwrap();

        assert_eq!(row.event_type, EventType::NotificationTrigger);
        assert_eq!(row.payload["title"], "Pay rent");
        assert!(row.payload.get("event_id").is_none());
    }

    #[test]
    fn status_roundtrips_through_storage_names() {
        for status in [OutboxStatus::Pending, OutboxStatus::Sent, OutboxStatus::Failed] {
            assert_eq!(status.as_str().parse::<OutboxStatus>().unwrap(), status);
        }
        assert!("RETRYING".parse::<OutboxStatus>().is_err());
    }
}
