//! Live snapshot delivery: cancellable subscriptions and keyed fan-out.
//!
//! Consumers never receive deltas. Every message is the complete current
//! state of whatever the subscription is keyed on.

pub mod snapshot_feed;
pub mod subscription;

pub use snapshot_feed::{FeedError, SnapshotFeed};
pub use subscription::{Subscription, SubscriptionId, Unsubscribe};
