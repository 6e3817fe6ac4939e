// src/core/pubsub/broadcast.rs

//! Fan-out of a wrapped payload to the members of one channel.

use super::{ConnectionId, SubscriptionRegistry};
use bytes::Bytes;
use tracing::trace;

/// Queues `payload` on every live member of `channel`, skipping `skip` if given.
///
/// Delivery is fire-and-forget: there is no acknowledgement and no retry. Returns
/// the number of connections the payload was queued on.
pub fn deliver(
    registry: &SubscriptionRegistry,
    channel: &str,
    payload: &Bytes,
    skip: Option<&ConnectionId>,
) -> usize {
    let mut delivered = 0;
    for subscriber in registry.members_iter(channel) {
        if skip.is_some_and(|id| id == subscriber.id()) {
            continue;
        }
        if subscriber.send(payload.clone()) {
            delivered += 1;
        } else {
            trace!("Skipping closed subscriber {} on '{}'", subscriber.id(), channel);
        }
    }
    delivered
}
