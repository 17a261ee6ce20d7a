use super::{IOutboxBatch, IOutboxRepo};
use chrono::{DateTime, Utc};
use remra_domain::{OutboxEvent, OutboxStatus, ID, MAX_RETRIES};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct InMemoryOutboxRepo {
    rows: Arc<Mutex<Vec<OutboxEvent>>>,
    claimed: Arc<Mutex<HashSet<ID>>>,
}

impl InMemoryOutboxRepo {
    pub fn new(rows: Arc<Mutex<Vec<OutboxEvent>>>) -> Self {
        Self {
            rows,
            claimed: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

#[async_trait::async_trait]
impl IOutboxRepo for InMemoryOutboxRepo {
    async fn claim_pending(&self, limit: i64) -> anyhow::Result<Box<dyn IOutboxBatch>> {
        let rows = self.rows.lock().unwrap();
        let mut claimed = self.claimed.lock().unwrap();

        let mut events: Vec<OutboxEvent> = rows
            .iter()
            .filter(|row| {
                row.status == OutboxStatus::Pending
                    && row.retry_count < MAX_RETRIES
                    && !claimed.contains(&row.id)
            })
            .cloned()
            .collect();
        // Stable sort: rows sharing a timestamp keep their commit order
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        events.truncate(limit as usize);

        for event in &events {
            claimed.insert(event.id.clone());
        }

        Ok(Box::new(InMemoryOutboxBatch {
            rows: self.rows.clone(),
            claimed: self.claimed.clone(),
            events,
        }))
    }

    async fn find_by_aggregate(&self, aggregate_id: &ID) -> anyhow::Result<Vec<OutboxEvent>> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<OutboxEvent> = rows
            .iter()
            .filter(|row| &row.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }
}

pub struct InMemoryOutboxBatch {
    rows: Arc<Mutex<Vec<OutboxEvent>>>,
    claimed: Arc<Mutex<HashSet<ID>>>,
    events: Vec<OutboxEvent>,
}

#[async_trait::async_trait]
impl IOutboxBatch for InMemoryOutboxBatch {
    fn events(&self) -> &[OutboxEvent] {
        &self.events
    }

    async fn mark_sent(&mut self, id: &ID, processed_at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| &row.id == id) {
            row.status = OutboxStatus::Sent;
            row.processed_at = Some(processed_at);
        }
        Ok(())
    }

    async fn record_failure(&mut self, id: &ID, error: &str) -> anyhow::Result<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| &row.id == id) {
            row.retry_count += 1;
            row.last_error = Some(error.to_string());
            if row.retry_count >= MAX_RETRIES {
                row.status = OutboxStatus::Failed;
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

// Dropping a batch, committed or not, releases its claims; rows that were
// not marked stay PENDING and are picked up by the next tick.
impl Drop for InMemoryOutboxBatch {
    fn drop(&mut self) {
        let mut claimed = self.claimed.lock().unwrap();
        for event in &self.events {
            claimed.remove(&event.id);
        }
    }
}
