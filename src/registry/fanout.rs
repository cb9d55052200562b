//! Fan-out seam between the resequencer and the registry

use std::future::Future;

use bytes::Bytes;

use crate::protocol::SubscriberId;

/// Registry operations the resequencer drives, one call per delivered event
///
/// Implementations swallow delivery failures; nothing is reported back to
/// the caller.
pub trait Fanout: Send + Sync {
    /// `follower` starts following `followee`
    fn follow(
        &self,
        followee: &SubscriberId,
        follower: &SubscriberId,
    ) -> impl Future<Output = ()> + Send;

    /// `follower` stops following `followee`
    fn unfollow(
        &self,
        followee: &SubscriberId,
        follower: &SubscriberId,
    ) -> impl Future<Output = ()> + Send;

    /// Deliver to one subscriber, if connected
    fn send_to_one(&self, id: &SubscriberId, data: &Bytes) -> impl Future<Output = ()> + Send;

    /// Deliver to every connected subscriber
    fn send_to_all(&self, data: &Bytes) -> impl Future<Output = ()> + Send;

    /// Deliver to every connected follower of `followee`
    fn send_to_followers(
        &self,
        followee: &SubscriberId,
        data: &Bytes,
    ) -> impl Future<Output = ()> + Send;
}
