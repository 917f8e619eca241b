//! Cancellable subscription to a stream of full snapshots.
//!
//! A subscription is a receiving end plus a weak handle back to whatever
//! registry produced it. Cancelling (explicitly or by dropping) removes the
//! sender from that registry, so nothing is delivered or buffered for it
//! afterwards. If the registry goes away first, the receiver disconnects.
//!
//! ## Usage Pattern
//!
//! ```ignore
//! let sub = store.subscribe(owner_id)?;
//!
//! loop {
//!     match sub.recv_timeout(Duration::from_millis(250)) {
//!         Ok(snapshot) => render(snapshot),
//!         Err(RecvTimeoutError::Timeout) => continue,   // check for shutdown
//!         Err(RecvTimeoutError::Disconnected) => break, // feed went away
//!     }
//! }
//!
//! sub.cancel();
//! ```

use std::sync::Weak;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Registry-local identifier of a subscription.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Something that can forget a subscriber.
///
/// Implementations must be idempotent: unsubscribing an unknown id is a no-op.
pub trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriptionId);
}

/// A subscription to a snapshot stream.
///
/// Every message replaces the previous one; consumers that only care about
/// the current state can call [`Subscription::latest`] to skip stale ones.
///
/// Subscriptions are meant for single-threaded consumption. Hand one to a
/// worker thread rather than sharing it.
pub struct Subscription<M> {
    id: SubscriptionId,
    receiver: Receiver<M>,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl<M> Subscription<M> {
    pub fn new(id: SubscriptionId, receiver: Receiver<M>, registry: Weak<dyn Unsubscribe>) -> Self {
        Self {
            id,
            receiver,
            registry: Some(registry),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Block until the next snapshot is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a snapshot.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything queued so far and return only the newest snapshot.
    pub fn latest(&self) -> Option<M> {
        let mut newest = None;
        while let Ok(m) = self.receiver.try_recv() {
            newest = Some(m);
        }
        newest
    }

    /// Stop receiving. Equivalent to dropping the subscription.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|r| r.upgrade()) {
            registry.unsubscribe(self.id);
        }
    }
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
