use crate::shared::entity::{Entity, ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const REMINDER_TITLE_MAX_LEN: usize = 255;

/// A `Reminder` is a user-owned note that fires at `remind_at`. The
/// due-time scan worker is the only writer of the terminal `is_sent`
/// transition; once sent, the row can no longer be updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ID,
    pub user_id: ID,
    pub title: String,
    pub description: String,
    /// The instant at which the owner should be notified
    pub remind_at: DateTime<Utc>,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        user_id: ID,
        title: String,
        description: String,
        remind_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ID::new(),
            user_id,
            title,
            description,
            remind_at,
            is_sent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Reminder {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Status filter for listing a user's reminders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderFilter {
    All,
    Pending,
    Sent,
}

impl FromStr for ReminderFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" | "" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            _ => Err(()),
        }
    }
}
