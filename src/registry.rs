//! Subscriber registry for the live feed.
//!
//! Membership is the only mutable state shared between the broadcast
//! scheduler and the transport layer. The mutex is scoped strictly to
//! membership mutation: sweeps iterate over a cloned snapshot, so the lock
//! is never held across a storage read or a socket write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use metrics::gauge;
use tokio::sync::mpsc::UnboundedSender;

/// Opaque handle to one live push-capable connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Queue feeding one subscriber's socket task. Payloads are pre-serialized
/// envelopes; a failed send means the receiving task is gone.
pub type SubscriberQueue = UnboundedSender<String>;

#[derive(Default)]
pub struct SubscriberRegistry {
    members: Mutex<HashMap<SubscriberId, SubscriberQueue>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Never fails; the id is unique for the process
    /// lifetime.
    pub fn register(&self, queue: SubscriberQueue) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut members = self.members.lock().expect("registry mutex poisoned");
        members.insert(id, queue);
        gauge!("feed_subscribers").set(members.len() as f64);
        id
    }

    /// Remove a connection if present. Idempotent: unregistering an absent
    /// id is a no-op.
    pub fn unregister(&self, id: SubscriberId) {
        let mut members = self.members.lock().expect("registry mutex poisoned");
        members.remove(&id);
        gauge!("feed_subscribers").set(members.len() as f64);
    }

    /// Current membership, cloned for iteration outside the lock. A
    /// subscriber disconnecting mid-sweep fails its own delivery and nothing
    /// else.
    pub fn snapshot(&self) -> Vec<(SubscriberId, SubscriberQueue)> {
        let members = self.members.lock().expect("registry mutex poisoned");
        members.iter().map(|(id, q)| (*id, q.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.members.lock().expect("registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members
            .lock()
            .expect("registry mutex poisoned")
            .contains_key(&id)
    }
}
