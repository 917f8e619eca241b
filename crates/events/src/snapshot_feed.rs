//! In-memory keyed fan-out of full snapshots.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak, mpsc};

use thiserror::Error;

use crate::subscription::{Subscription, SubscriptionId, Unsubscribe};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Internal lock poisoning.
    #[error("snapshot feed lock poisoned")]
    Poisoned,
}

type Senders<M> = Vec<(SubscriptionId, mpsc::Sender<M>)>;

struct FeedInner<K, M> {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<K, Senders<M>>>,
}

impl<K, M> Unsubscribe for FeedInner<K, M>
where
    K: Eq + Hash + Send,
    M: Send,
{
    fn unsubscribe(&self, id: SubscriptionId) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|_, senders| {
            senders.retain(|(sid, _)| *sid != id);
            !senders.is_empty()
        });
        tracing::debug!(subscription = %id, "snapshot subscription cancelled");
    }
}

/// Keyed pub/sub for full snapshots.
///
/// - No IO / no async
/// - Each publish fans out one clone per live subscriber of that key
/// - Dead subscribers (receiver dropped) are pruned while publishing
///
/// The feed does not order concurrent publishers. Callers that need
/// subscribers to converge on the latest state must publish while holding the
/// lock that serializes their writes.
pub struct SnapshotFeed<K, M> {
    inner: Arc<FeedInner<K, M>>,
}

impl<K, M> SnapshotFeed<K, M>
where
    K: Eq + Hash + Clone + Send + 'static,
    M: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for `key`.
    ///
    /// When `initial` is given it is queued before any later publish, so the
    /// subscriber starts from the current state instead of waiting for the
    /// next change.
    pub fn subscribe(&self, key: K, initial: Option<M>) -> Result<Subscription<M>, FeedError> {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        if let Some(snapshot) = initial {
            // The receiver is alive right here, so this cannot fail.
            let _ = tx.send(snapshot);
        }

        let mut subs = self.inner.subscribers.lock().map_err(|_| FeedError::Poisoned)?;
        subs.entry(key).or_default().push((id, tx));
        drop(subs);

        let weak = Arc::downgrade(&self.inner);
        let registry: Weak<dyn Unsubscribe> = weak;
        Ok(Subscription::new(id, rx, registry))
    }

    /// Push `snapshot` to every live subscriber of `key`.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, key: &K, snapshot: M) -> Result<usize, FeedError> {
        let mut subs = self.inner.subscribers.lock().map_err(|_| FeedError::Poisoned)?;

        let Some(senders) = subs.get_mut(key) else {
            return Ok(0);
        };

        senders.retain(|(_, tx)| tx.send(snapshot.clone()).is_ok());
        let delivered = senders.len();
        if delivered == 0 {
            subs.remove(key);
        }

        Ok(delivered)
    }

    /// Number of live subscribers registered for `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.inner
            .subscribers
            .lock()
            .map(|subs| subs.get(key).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl<K, M> Default for SnapshotFeed<K, M> {
    fn default() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl<K, M> core::fmt::Debug for SnapshotFeed<K, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnapshotFeed").finish_non_exhaustive()
    }
}
