use super::IReminderRepo;
use chrono::{DateTime, Utc};
use remra_domain::{OutboxEvent, Reminder, ReminderFilter, ID};
use std::sync::{Arc, Mutex};

/// In-memory twin of the Postgres repo. Shares the outbox collection with
/// `InMemoryOutboxRepo` so that mutations and the relay observe the same
/// rows, like the shared database table does.
pub struct InMemoryReminderRepo {
    reminders: Mutex<Vec<Reminder>>,
    outbox: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl InMemoryReminderRepo {
    pub fn new(outbox: Arc<Mutex<Vec<OutboxEvent>>>) -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
            outbox,
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<()> {
        let mut reminders = self.reminders.lock().unwrap();
        reminders.push(reminder.clone());
        self.outbox.lock().unwrap().push(outbox.clone());
        Ok(())
    }

    async fn save(&self, reminder: &Reminder, outbox: &OutboxEvent) -> anyhow::Result<bool> {
        let mut reminders = self.reminders.lock().unwrap();
        let existing = reminders
            .iter_mut()
            .find(|r| r.id == reminder.id && r.user_id == reminder.user_id && !r.is_sent);
        match existing {
            Some(row) => {
                *row = reminder.clone();
                self.outbox.lock().unwrap().push(outbox.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, user_id: &ID, id: &ID, outbox: &OutboxEvent) -> anyhow::Result<bool> {
        let mut reminders = self.reminders.lock().unwrap();
        let position = reminders
            .iter()
            .position(|r| &r.id == id && &r.user_id == user_id && !r.is_sent);
        match position {
            Some(i) => {
                reminders.remove(i);
                self.outbox.lock().unwrap().push(outbox.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, user_id: &ID, id: &ID) -> Option<Reminder> {
        self.reminders
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.id == id && &r.user_id == user_id)
            .cloned()
    }

    async fn find_by_user(&self, user_id: &ID, filter: ReminderFilter) -> Vec<Reminder> {
        let reminders = self.reminders.lock().unwrap();
        let mut found: Vec<Reminder> = reminders
            .iter()
            .filter(|r| &r.user_id == user_id)
            .filter(|r| match filter {
                ReminderFilter::All => true,
                ReminderFilter::Pending => !r.is_sent,
                ReminderFilter::Sent => r.is_sent,
            })
            .cloned()
            .collect();
        match filter {
            ReminderFilter::Sent => found.sort_by(|a, b| b.remind_at.cmp(&a.remind_at)),
            _ => found.sort_by(|a, b| a.remind_at.cmp(&b.remind_at)),
        }
        found
    }

    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<Reminder>> {
        let reminders = self.reminders.lock().unwrap();
        let mut due: Vec<Reminder> = reminders
            .iter()
            .filter(|r| !r.is_sent && r.remind_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.remind_at.cmp(&b.remind_at));
        Ok(due)
    }

    async fn fire(
        &self,
        id: &ID,
        fired_at: DateTime<Utc>,
        trigger: &OutboxEvent,
        lifecycle: &OutboxEvent,
    ) -> anyhow::Result<bool> {
        let mut reminders = self.reminders.lock().unwrap();
        let row = reminders.iter_mut().find(|r| &r.id == id && !r.is_sent);
        match row {
            Some(row) => {
                row.is_sent = true;
                row.updated_at = fired_at;
                let mut outbox = self.outbox.lock().unwrap();
                outbox.push(trigger.clone());
                outbox.push(lifecycle.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
