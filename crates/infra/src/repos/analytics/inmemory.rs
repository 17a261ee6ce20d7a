use super::{IAnalyticsRepo, ProjectionOutcome};
use remra_domain::{EventType, LifecycleEvent, UserStatistics, ID};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub struct InMemoryAnalyticsRepo {
    statistics: Mutex<HashMap<ID, UserStatistics>>,
    processed: Mutex<HashSet<ID>>,
}

impl InMemoryAnalyticsRepo {
    pub fn new() -> Self {
        Self {
            statistics: Mutex::new(HashMap::new()),
            processed: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for InMemoryAnalyticsRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IAnalyticsRepo for InMemoryAnalyticsRepo {
    async fn apply(&self, event: &LifecycleEvent) -> anyhow::Result<ProjectionOutcome> {
        let mut processed = self.processed.lock().unwrap();
        if processed.contains(&event.event_id) {
            return Ok(ProjectionOutcome::Duplicate);
        }

        let mut statistics = self.statistics.lock().unwrap();
        match event.event_type {
            EventType::Created => {
                let stats = statistics.entry(event.user_id.clone()).or_insert_with(|| {
                    UserStatistics::zeroed(event.user_id.clone(), event.timestamp)
                });
                stats.total_created += 1;
                stats.active += 1;
                stats.first_reminder_at = Some(match stats.first_reminder_at {
                    Some(first) => first.min(event.timestamp),
                    None => event.timestamp,
                });
                stats.last_activity_at = Some(event.timestamp);
                stats.updated_at = event.timestamp;
                stats.recompute_completion_rate();
            }
            EventType::NotificationSent => {
                if let Some(stats) = statistics.get_mut(&event.user_id) {
                    stats.total_completed += 1;
                    stats.active = (stats.active - 1).max(0);
                    stats.last_activity_at = Some(event.timestamp);
                    stats.updated_at = event.timestamp;
                    stats.recompute_completion_rate();
                }
            }
            EventType::Deleted => {
                if let Some(stats) = statistics.get_mut(&event.user_id) {
                    stats.total_deleted += 1;
                    stats.active = (stats.active - 1).max(0);
                    stats.last_activity_at = Some(event.timestamp);
                    stats.updated_at = event.timestamp;
                }
            }
            EventType::Updated | EventType::NotificationTrigger => {}
        }

        processed.insert(event.event_id.clone());
        Ok(ProjectionOutcome::Applied)
    }

    async fn find_by_user(&self, user_id: &ID) -> anyhow::Result<Option<UserStatistics>> {
        Ok(self.statistics.lock().unwrap().get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use remra_domain::Reminder;

    fn reminder(user_id: &ID) -> Reminder {
        let now = Utc::now();
        Reminder::new(
            user_id.clone(),
            "Check the oven".into(),
            "".into(),
            now + chrono::Duration::minutes(5),
            now,
        )
    }

    #[tokio::test]
    async fn duplicate_event_ids_are_applied_once() {
        let repo = InMemoryAnalyticsRepo::new();
        let user_id = ID::new();
        let event = LifecycleEvent::created(&reminder(&user_id), Utc::now());

        assert_eq!(repo.apply(&event).await.unwrap(), ProjectionOutcome::Applied);
        assert_eq!(
            repo.apply(&event).await.unwrap(),
            ProjectionOutcome::Duplicate
        );
        assert_eq!(
            repo.apply(&event).await.unwrap(),
            ProjectionOutcome::Duplicate
        );

        let stats = repo.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.active, 1);
    }

    #[tokio::test]
    async fn active_saturates_at_zero() {
        let repo = InMemoryAnalyticsRepo::new();
        let user_id = ID::new();
        let r = reminder(&user_id);

        // Completion arriving before the matching creation
        repo.apply(&LifecycleEvent::notification_sent(&r, Utc::now()))
            .await
            .unwrap();
        repo.apply(&LifecycleEvent::created(&r, Utc::now()))
            .await
            .unwrap();

        let stats = repo.find_by_user(&user_id).await.unwrap().unwrap();
        assert!(stats.active >= 0);
        assert_eq!(stats.total_created, 1);
    }

    #[tokio::test]
    async fn completion_rate_follows_the_counters() {
        let repo = InMemoryAnalyticsRepo::new();
        let user_id = ID::new();

        for _ in 0..2 {
            let r = reminder(&user_id);
            repo.apply(&LifecycleEvent::created(&r, Utc::now()))
                .await
                .unwrap();
        }
        let r = reminder(&user_id);
        repo.apply(&LifecycleEvent::created(&r, Utc::now()))
            .await
            .unwrap();
        repo.apply(&LifecycleEvent::notification_sent(&r, Utc::now()))
            .await
            .unwrap();

        let stats = repo.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stats.total_created, 3);
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.completion_rate, 33.33);
    }

    #[tokio::test]
    async fn updated_events_are_recorded_but_change_nothing() {
        let repo = InMemoryAnalyticsRepo::new();
        let user_id = ID::new();
        let r = reminder(&user_id);

        repo.apply(&LifecycleEvent::created(&r, Utc::now()))
            .await
            .unwrap();
        let update = LifecycleEvent::updated(&r, Utc::now());
        assert_eq!(
            repo.apply(&update).await.unwrap(),
            ProjectionOutcome::Applied
        );
        assert_eq!(
            repo.apply(&update).await.unwrap(),
            ProjectionOutcome::Duplicate
        );

        let stats = repo.find_by_user(&user_id).await.unwrap().unwrap();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.total_completed, 0);
    }

    #[tokio::test]
    async fn events_for_missing_rows_are_still_marked_processed() {
        let repo = InMemoryAnalyticsRepo::new();
        let user_id = ID::new();
        let r = reminder(&user_id);

        let event = LifecycleEvent::deleted(&r.id, &user_id, Utc::now());
        assert_eq!(
            repo.apply(&event).await.unwrap(),
            ProjectionOutcome::Applied
        );
        assert_eq!(
            repo.apply(&event).await.unwrap(),
            ProjectionOutcome::Duplicate
        );
        assert!(repo.find_by_user(&user_id).await.unwrap().is_none());
    }
}
