// src/core/pubsub/mod.rs

//! The channel subscription system: which connections listen on which channel,
//! and the fan-out that delivers a payload to them.

pub mod broadcast;
mod subscriber;

pub use broadcast::deliver;
pub use subscriber::{ConnectionId, Subscriber};

use crate::connection::SessionState;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Maps each channel name to its subscribers.
///
/// A channel entry exists only while it has at least one member, and a connection is
/// a member of at most one channel: the one recorded on its session.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    channels: HashMap<String, IndexMap<ConnectionId, Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Moves a session into `channel`, leaving its previous channel first.
    pub fn subscribe(&mut self, session: &mut SessionState, channel: &str) {
        if session.channel() == Some(channel) {
            return;
        }
        self.unsubscribe(session);
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(*session.id(), session.subscriber().clone());
        session.set_channel(Some(channel.to_string()));
        debug!("Client {} subscribes for channel: {}", session.id(), channel);
    }

    /// Removes a session from its current channel, if any. Returns the channel it left.
    pub fn unsubscribe(&mut self, session: &mut SessionState) -> Option<String> {
        let channel = session.channel()?.to_string();
        if let Some(members) = self.channels.get_mut(&channel) {
            members.shift_remove(session.id());
            if members.is_empty() {
                self.channels.remove(&channel);
                debug!("Empty channel '{}' removed.", channel);
            }
        }
        session.set_channel(None);
        Some(channel)
    }

    /// A snapshot of the channel's subscribers in subscription order.
    pub fn members(&self, channel: &str) -> Vec<Subscriber> {
        self.channels
            .get(channel)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn members_iter<'a>(&'a self, channel: &str) -> impl Iterator<Item = &'a Subscriber> {
        self.channels
            .get(channel)
            .into_iter()
            .flat_map(|members| members.values())
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn is_member(&self, id: &ConnectionId, channel: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains_key(id))
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, IndexMap::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns a list of all active channels.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }
}
