//! Subscriber registry implementation
//!
//! Holds the live subscriber connections and the follow graph behind one
//! exclusive lock, so the two views never disagree while connections come
//! and go during a fan-out.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::Mutex;

use super::entry::Subscriber;
use super::fanout::Fanout;
use super::graph::FollowGraph;
use crate::protocol::SubscriberId;
use crate::stats::RegistryStats;

/// Delivery counters
#[derive(Default)]
struct Deliveries {
    succeeded: u64,
    failed: u64,
}

impl Deliveries {
    /// Write to one subscriber, logging but not propagating failures
    async fn send(&mut self, id: &SubscriberId, subscriber: &mut Subscriber, data: &[u8]) {
        match subscriber.send(data).await {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    subscriber = %id,
                    connection_id = subscriber.connection_id,
                    error = %e,
                    "Delivery failed"
                );
            }
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    subscribers: HashMap<SubscriberId, Subscriber>,
    graph: FollowGraph,
    deliveries: Deliveries,
}

/// Registry of connected subscribers and who follows whom
///
/// Every method takes the lock for its whole body, including the socket
/// writes of a fan-out. There is no atomicity across calls.
pub struct SubscriberRegistry {
    inner: Mutex<RegistryInner>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Register a subscriber under `id`
    ///
    /// An existing entry under the same ID is replaced, and its connection
    /// ID is returned. The displaced connection is not closed here: its
    /// writer goes back to its owner (see [`Subscriber::with_owner`]).
    pub async fn identify(
        &self,
        id: impl Into<SubscriberId>,
        subscriber: Subscriber,
    ) -> Option<u64> {
        let id = id.into();
        let mut inner = self.inner.lock().await;

        tracing::info!(
            subscriber = %id,
            connection_id = subscriber.connection_id,
            peer = ?subscriber.peer_addr,
            "Subscriber identified"
        );

        let previous = inner.subscribers.insert(id.clone(), subscriber)?;
        let replaced = previous.connection_id;
        tracing::warn!(
            subscriber = %id,
            replaced_connection_id = replaced,
            "Subscriber ID reused, previous connection replaced"
        );
        previous.release();
        Some(replaced)
    }

    /// Remove the subscriber under `id` if it is still `connection_id`
    ///
    /// A connection that was already replaced by a newer one with the same
    /// ID leaves the newer entry alone. Returns whether anything was removed.
    pub async fn remove(&self, id: impl AsRef<[u8]>, connection_id: u64) -> bool {
        let id = id.as_ref();
        let mut inner = self.inner.lock().await;

        let current = inner
            .subscribers
            .get(id)
            .map(|s| s.connection_id == connection_id);

        match current {
            Some(true) => {
                if let Some((id, _)) = inner.subscribers.remove_entry(id) {
                    tracing::info!(subscriber = %id, connection_id, "Subscriber removed");
                }
                true
            }
            Some(false) => {
                let id = String::from_utf8_lossy(id);
                tracing::debug!(
                    subscriber = %id,
                    connection_id,
                    "Stale disconnect, newer connection kept"
                );
                false
            }
            None => false,
        }
    }

    /// Check whether a subscriber is currently connected under `id`
    pub async fn is_connected(&self, id: impl AsRef<[u8]>) -> bool {
        self.inner
            .lock()
            .await
            .subscribers
            .contains_key(id.as_ref())
    }

    /// Connection currently registered under `id`
    pub async fn connection_of(&self, id: impl AsRef<[u8]>) -> Option<u64> {
        let inner = self.inner.lock().await;
        inner.subscribers.get(id.as_ref()).map(|s| s.connection_id)
    }

    /// Number of connected subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }

    /// Followers of `followee`, sorted
    pub async fn followers_of(&self, followee: impl AsRef<[u8]>) -> Vec<SubscriberId> {
        let inner = self.inner.lock().await;
        let mut ids: Vec<SubscriberId> = inner
            .graph
            .followers(followee.as_ref())
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of registry counters
    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock().await;
        RegistryStats {
            subscriber_count: inner.subscribers.len(),
            followee_count: inner.graph.followee_count(),
            follow_edges: inner.graph.edge_count(),
            deliveries: inner.deliveries.succeeded,
            failed_deliveries: inner.deliveries.failed,
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Fanout for SubscriberRegistry {
    async fn follow(&self, followee: &SubscriberId, follower: &SubscriberId) {
        let mut inner = self.inner.lock().await;
        if inner.graph.follow(followee, follower) {
            tracing::debug!(followee = %followee, follower = %follower, "Follow added");
        }
    }

    async fn unfollow(&self, followee: &SubscriberId, follower: &SubscriberId) {
        let mut inner = self.inner.lock().await;
        if inner.graph.unfollow(followee.as_bytes(), follower.as_bytes()) {
            tracing::debug!(followee = %followee, follower = %follower, "Follow removed");
        }
    }

    async fn send_to_one(&self, id: &SubscriberId, data: &Bytes) {
        let mut inner = self.inner.lock().await;
        let RegistryInner {
            subscribers,
            deliveries,
            ..
        } = &mut *inner;

        match subscribers.get_mut(id) {
            Some(subscriber) => deliveries.send(id, subscriber, data).await,
            None => tracing::trace!(subscriber = %id, "Recipient not connected, skipping"),
        }
    }

    async fn send_to_all(&self, data: &Bytes) {
        let mut inner = self.inner.lock().await;
        let RegistryInner {
            subscribers,
            deliveries,
            ..
        } = &mut *inner;

        for (id, subscriber) in subscribers.iter_mut() {
            deliveries.send(id, subscriber, data).await;
        }
    }

    async fn send_to_followers(&self, followee: &SubscriberId, data: &Bytes) {
        let mut inner = self.inner.lock().await;
        let RegistryInner {
            subscribers,
            graph,
            deliveries,
        } = &mut *inner;

        for id in graph.followers(followee.as_bytes()) {
            match subscribers.get_mut(id) {
                Some(subscriber) => deliveries.send(id, subscriber, data).await,
                None => tracing::trace!(subscriber = %id, "Follower not connected, skipping"),
            }
        }
    }
}
