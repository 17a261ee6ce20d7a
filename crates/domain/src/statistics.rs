use crate::shared::entity::ID;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user aggregate counters maintained by the analytics projector.
/// `active` is a lossy counter: it saturates at zero, so out-of-order
/// delivery may briefly overstate it (the projector keeps no per-reminder
/// state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: ID,
    pub total_created: i64,
    pub total_completed: i64,
    pub total_deleted: i64,
    pub active: i64,
    pub completion_rate: f64,
    pub first_reminder_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStatistics {
    /// The read path answers with this when a user has produced no events
    pub fn zeroed(user_id: ID, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_created: 0,
            total_completed: 0,
            total_deleted: 0,
            active: 0,
            completion_rate: 0.0,
            first_reminder_at: None,
            last_activity_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `completed / created * 100`, rounded to two decimals, zero when
    /// nothing has been created yet
    pub fn recompute_completion_rate(&mut self) {
        self.completion_rate = if self.total_created > 0 {
            (self.total_completed as f64 / self.total_created as f64 * 100.0 * 100.0).round()
                / 100.0
        } else {
            0.0
        };
    }
}
