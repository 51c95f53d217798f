use super::{DomainEvent, Topic};
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;

/// Which events a subscriber wants. Empty fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub topic: Option<Topic>,
    pub organization_id: Option<i32>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, event: &DomainEvent) -> bool {
        if let Some(topic) = self.topic {
            if event.topic() != topic {
                return false;
            }
        }
        match self.organization_id {
            Some(org_id) => event.organization_id() == Some(org_id),
            None => true,
        }
    }
}

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::UnboundedSender<DomainEvent>,
}

/// In-process publish/subscribe channel for committed changes.
#[derive(Clone)]
pub struct ChangeFeed {
    subscribers: Arc<DashMap<u64, Subscriber>>,
    next_id: Arc<AtomicU64>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> (u64, mpsc::UnboundedReceiver<DomainEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, Subscriber { filter, tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }

    /// Deliver to every matching subscriber, dropping closed ones.
    pub fn publish(&self, event: DomainEvent) {
        self.subscribers.retain(|_, sub| {
            if sub.tx.is_closed() {
                return false;
            }
            if !sub.filter.matches(&event) {
                return true;
            }
            sub.tx.send(event.clone()).is_ok()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
