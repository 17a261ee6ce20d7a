mod event;
mod outbox;
mod reminder;
mod shared;
mod statistics;

pub use event::{EventType, InvalidEventTypeError, LifecycleEvent};
pub use outbox::{InvalidOutboxStatusError, OutboxEvent, OutboxStatus, MAX_RETRIES};
pub use reminder::{Reminder, ReminderFilter, REMINDER_TITLE_MAX_LEN};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use statistics::UserStatistics;
