//! Subscriber registry for live contact updates
//!
//! Each subscriber owns a `watch` mailbox holding only the newest snapshot:
//! a slow client skips intermediate states and converges to the latest one.
//! Delivery fails only when the receiving side is gone, and a failed
//! subscriber is pruned during that broadcast. There is no heartbeat.

use super::snapshot::Snapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

/// Registered push target
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: Uuid,
    tx: Arc<watch::Sender<Snapshot>>,
}

/// Receiving end handed to the connection that streams snapshots
pub type SubscriberFeed = watch::Receiver<Snapshot>;

impl Subscriber {
    /// New subscriber and the feed its connection reads from
    ///
    /// The feed starts empty; its first change is the admission snapshot.
    pub fn channel() -> (Self, SubscriberFeed) {
        let (tx, rx) = watch::channel(Snapshot::from(""));
        (
            Self {
                id: Uuid::new_v4(),
                tx: Arc::new(tx),
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn deliver(&self, payload: &Snapshot) -> bool {
        self.tx.send(payload.clone()).is_ok()
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a subscriber and deliver `snapshot` to it
    ///
    /// Returns `false` without sending anything if the subscriber is already
    /// registered, or if its connection closed before admission.
    pub fn connect(&self, subscriber: Subscriber, snapshot: Snapshot) -> bool {
        let mut subscribers = self.lock();
        if subscribers.contains_key(&subscriber.id) {
            debug!("Subscriber {} already connected", subscriber.id);
            return false;
        }
        if !subscriber.deliver(&snapshot) {
            debug!("Subscriber {} closed before admission", subscriber.id);
            return false;
        }
        let id = subscriber.id;
        subscribers.insert(id, subscriber);
        info!("Live subscriber {} connected, total: {}", id, subscribers.len());
        true
    }

    /// Remove a subscriber; no-op if absent
    pub fn disconnect(&self, id: Uuid) {
        let mut subscribers = self.lock();
        if subscribers.remove(&id).is_some() {
            info!("Live subscriber {} disconnected, total: {}", id, subscribers.len());
        }
    }

    /// Deliver `payload` to every subscriber, pruning the ones that are gone
    pub fn broadcast(&self, payload: Snapshot) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.lock().retain(|id, subscriber| {
            if subscriber.deliver(&payload) {
                report.delivered += 1;
                true
            } else {
                debug!("Pruning closed subscriber {}", id);
                report.pruned += 1;
                false
            }
        });
        report
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.lock().contains_key(&id)
    }
}
