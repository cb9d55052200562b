//! Fan-out dispatch
//!
//! Maps a delivered event onto registry calls. The mapping depends only on
//! the event kind and never retries.

use crate::protocol::{EventKind, EventRecord};
use crate::registry::Fanout;

/// Apply one delivered event to the registry
pub async fn dispatch<F: Fanout>(fanout: &F, event: &EventRecord) {
    let raw = &event.raw;

    match &event.kind {
        Some(EventKind::Broadcast) => fanout.send_to_all(raw).await,
        Some(EventKind::StatusUpdate { actor }) => fanout.send_to_followers(actor, raw).await,
        Some(EventKind::Follow { actor, target }) => {
            // Two locked sections; an unfollow may interleave between them
            fanout.follow(target, actor).await;
            fanout.send_to_one(target, raw).await;
        }
        Some(EventKind::Unfollow { actor, target }) => fanout.unfollow(target, actor).await,
        Some(EventKind::PrivateMessage { target, .. }) => fanout.send_to_one(target, raw).await,
        None => {
            let record = String::from_utf8_lossy(raw);
            tracing::warn!(
                sequence = event.sequence,
                record = %record.trim_end(),
                "Unrecognized event layout, skipping dispatch"
            );
        }
    }
}
