use crate::{reminder::Reminder, shared::entity::ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// Event types carried by outbox rows. The first four travel on the
/// lifecycle stream; `notification_trigger` travels on the notification
/// stream and carries a raw reminder snapshot instead of a lifecycle
/// envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    NotificationSent,
    NotificationTrigger,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::NotificationSent => "notification_sent",
            Self::NotificationTrigger => "notification_trigger",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InvalidEventTypeError {
    #[error("unknown event type: {0}")]
    Unknown(String),
}

impl FromStr for EventType {
    type Err = InvalidEventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            "notification_sent" => Ok(Self::NotificationSent),
            "notification_trigger" => Ok(Self::NotificationTrigger),
            _ => Err(InvalidEventTypeError::Unknown(s.to_string())),
        }
    }
}

/// Envelope published on the lifecycle stream. `event_id` is minted inside
/// the transaction that produces the event and is the idempotency key at
/// the analytics projector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: ID,
    pub event_type: EventType,
    pub reminder_id: ID,
    pub user_id: ID,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Reminder>,
}

impl LifecycleEvent {
    pub fn created(reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self::with_snapshot(EventType::Created, reminder, timestamp)
    }

    pub fn updated(reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self::with_snapshot(EventType::Updated, reminder, timestamp)
    }

    /// Deletion carries no snapshot, the row is gone
    pub fn deleted(reminder_id: &ID, user_id: &ID, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: ID::new(),
            event_type: EventType::Deleted,
            reminder_id: reminder_id.clone(),
            user_id: user_id.clone(),
            timestamp,
            payload: None,
        }
    }

    pub fn notification_sent(reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self::with_snapshot(EventType::NotificationSent, reminder, timestamp)
    }

    fn with_snapshot(event_type: EventType, reminder: &Reminder, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: ID::new(),
            event_type,
            reminder_id: reminder.id.clone(),
            user_id: reminder.user_id.clone(),
            timestamp,
            payload: Some(reminder.clone()),
        }
    }
}
