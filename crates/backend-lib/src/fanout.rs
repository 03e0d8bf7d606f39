// ============================
// dropmate-backend-lib/src/fanout.rs
// ============================
//! Publish/subscribe fan-out for live status streams.
//!
//! The [`Hub`] keeps two independent registries, one keyed by request id and
//! one keyed by locker id. Each registered [`Subscriber`] receives the JSON
//! encoding of every event published under its key, in publish order.
//! Transport is not the hub's concern: the SSE handlers register an
//! unbounded mpsc sender, tests register recording fakes.
use dashmap::DashMap;
use dropmate_common::StreamEvent;
use metrics::gauge;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metrics::STREAM_ACTIVE;

pub type SubscriptionId = Uuid;

/// The subscriber's receiving side is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

/// Anything that can take a serialized event.
pub trait Subscriber: Send + Sync {
    /// Hand over one event. Must not block.
    fn deliver(&self, json: &Arc<str>) -> Result<(), Closed>;
}

impl Subscriber for mpsc::UnboundedSender<Arc<str>> {
    fn deliver(&self, json: &Arc<str>) -> Result<(), Closed> {
        self.send(Arc::clone(json)).map_err(|_| Closed)
    }
}

/// Key a stream is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Request(String),
    Locker(String),
}

impl Topic {
    pub fn key(&self) -> &str {
        match self {
            Topic::Request(id) | Topic::Locker(id) => id.as_str(),
        }
    }

    fn scope(&self) -> &'static str {
        match self {
            Topic::Request(_) => "request",
            Topic::Locker(_) => "locker",
        }
    }
}

type SubscriberSet = HashMap<SubscriptionId, Arc<dyn Subscriber>>;

#[derive(Default)]
struct Registry {
    subs: DashMap<String, SubscriberSet>,
}

impl Registry {
    fn insert(&self, key: &str, id: SubscriptionId, subscriber: Arc<dyn Subscriber>) {
        self.subs.entry(key.to_string()).or_default().insert(id, subscriber);
    }

    fn remove(&self, key: &str, id: SubscriptionId) -> bool {
        let removed = match self.subs.get_mut(key) {
            Some(mut set) => set.remove(&id).is_some(),
            None => false,
        };
        self.subs.remove_if(key, |_, set| set.is_empty());
        removed
    }

    /// Deliver to every subscriber of `key`; returns (delivered, dropped).
    fn broadcast(&self, key: &str, json: &Arc<str>) -> (usize, usize) {
        let Some(mut set) = self.subs.get_mut(key) else {
            return (0, 0);
        };
        let before = set.len();
        set.retain(|_, subscriber| subscriber.deliver(json).is_ok());
        let delivered = set.len();
        let empty = set.is_empty();
        drop(set);
        if empty {
            self.subs.remove_if(key, |_, set| set.is_empty());
        }
        (delivered, before - delivered)
    }

    fn count(&self, key: &str) -> usize {
        self.subs.get(key).map_or(0, |set| set.len())
    }
}

/// Subscription registry for request and locker streams.
#[derive(Default)]
pub struct Hub {
    requests: Registry,
    lockers: Registry,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self, topic: &Topic) -> &Registry {
        match topic {
            Topic::Request(_) => &self.requests,
            Topic::Locker(_) => &self.lockers,
        }
    }

    /// Register `subscriber` under `topic` after handing it `snapshot`.
    ///
    /// The snapshot goes through the subscriber itself, so it is always the
    /// first thing the stream sees. The returned guard unsubscribes on drop.
    pub fn subscribe(
        self: &Arc<Self>,
        topic: Topic,
        subscriber: Arc<dyn Subscriber>,
        snapshot: &StreamEvent,
    ) -> Subscription {
        let id = Uuid::new_v4();
        match encode(snapshot) {
            Some(json) if subscriber.deliver(&json).is_err() => {
                tracing::debug!(
                    scope = topic.scope(),
                    key = topic.key(),
                    "subscriber closed before snapshot"
                );
            }
            _ => {
                self.registry(&topic).insert(topic.key(), id, subscriber);
                gauge!(STREAM_ACTIVE, "scope" => topic.scope()).increment(1.0);
                tracing::debug!(scope = topic.scope(), key = topic.key(), %id, "stream subscribed");
            }
        }
        Subscription {
            hub: Arc::clone(self),
            topic,
            id,
        }
    }

    /// Remove a subscription. Safe to call more than once.
    pub fn unsubscribe(&self, topic: &Topic, id: SubscriptionId) {
        if self.registry(topic).remove(topic.key(), id) {
            gauge!(STREAM_ACTIVE, "scope" => topic.scope()).decrement(1.0);
            tracing::debug!(scope = topic.scope(), key = topic.key(), %id, "stream unsubscribed");
        }
    }

    /// Send `event` to everyone subscribed to `topic`.
    ///
    /// Nobody listening is not an error. Subscribers whose receiving side is
    /// gone are dropped from the registry.
    pub fn publish(&self, topic: &Topic, event: &StreamEvent) {
        let Some(json) = encode(event) else {
            return;
        };
        let (delivered, dropped) = self.registry(topic).broadcast(topic.key(), &json);
        if dropped > 0 {
            gauge!(STREAM_ACTIVE, "scope" => topic.scope()).decrement(dropped as f64);
        }
        tracing::trace!(scope = topic.scope(), key = topic.key(), delivered, dropped, "published");
    }

    /// Number of live subscribers under `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.registry(topic).count(topic.key())
    }
}

fn encode(event: &StreamEvent) -> Option<Arc<str>> {
    match event.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode stream event");
            None
        }
    }
}

/// Live registration in the [`Hub`]; dropping it unsubscribes.
pub struct Subscription {
    hub: Arc<Hub>,
    topic: Topic,
    id: SubscriptionId,
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.topic, self.id);
    }
}
