use super::{ChangeFeed, DomainEvent, EventFilter};
use crate::services::profile::ProfileService;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;

/// Keeps profile aggregates in step with the tables they are derived from.
///
/// Listens on the change feed and recomputes the counters of every user an
/// event touches. Counters are never incremented inline.
pub struct CounterUpdater {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl CounterUpdater {
    pub fn new(db: DatabaseConnection, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let (sub_id, mut rx) = self.feed.subscribe(EventFilter::all());
        tokio::spawn(async move {
            let profiles = ProfileService::new(self.db);
            while let Some(event) = rx.recv().await {
                handle_event(&profiles, &event).await;
            }
            self.feed.unsubscribe(sub_id);
            tracing::debug!("Counter updater stopped");
        })
    }
}

async fn handle_event(profiles: &ProfileService, event: &DomainEvent) {
    for user_id in event.affected_users() {
        match profiles.recompute_counters(user_id).await {
            Ok(Some(profile)) => tracing::debug!(
                user_id,
                items_found = profile.items_found,
                items_claimed = profile.items_claimed,
                reputation = profile.reputation_score,
                "Profile counters recomputed"
            ),
            Ok(None) => tracing::debug!(user_id, "No profile to update"),
            Err(e) => tracing::warn!(user_id, "Failed to recompute counters: {}", e),
        }
    }
}
