// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket Hub (C9) — fans a project's execution envelopes out to every
//! subscriber of that project, fire-and-forget (spec.md §4.7).
//!
//! The accept loop is the router adapter's job; the hub owns the
//! subscriber registry, envelope validation, and encoding each broadcast
//! into the text frame its per-connection writer task actually sends.

use devteam_wire::{Envelope, EnvelopeError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

/// Per-connection write budget (spec.md §6 "500ms"). A subscriber whose
/// writer can't keep up gets dropped rather than let one slow reader
/// stall the broadcast for everyone else. Enforcing the budget itself is
/// the writer task's job (it owns the socket); the hub only hands it
/// frames to write.
pub const WRITE_BUDGET: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

/// A subscribed connection's outgoing queue. The router adapter owns the
/// other end (`UnboundedReceiver<Message>`) and is responsible for
/// actually writing frames to the socket within [`WRITE_BUDGET`].
pub type Subscriber = UnboundedSender<Message>;

struct Inner {
    by_project: HashMap<String, HashMap<ConnectionId, Subscriber>>,
}

/// The process-wide subscriber registry (spec.md §9 "Global mutable
/// state": one of three, alongside the container registry and the
/// workflow registry). Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    inner: std::sync::Arc<RwLock<Inner>>,
    next_id: std::sync::Arc<AtomicU64>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self { inner: std::sync::Arc::new(RwLock::new(Inner { by_project: HashMap::new() })), next_id: std::sync::Arc::new(AtomicU64::new(1)) }
    }

    /// Register a new subscriber for `project_id`, returning its id (so
    /// the caller can `unsubscribe` later) and the receiving half of its
    /// outgoing queue. The caller is expected to send a
    /// `connection-established` envelope (spec.md §4.7) right after.
    pub fn subscribe(&self, project_id: &str) -> (ConnectionId, UnboundedReceiver<Message>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().by_project.entry(project_id.to_string()).or_default().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, project_id: &str, connection: ConnectionId) {
        let mut inner = self.inner.write();
        if let Some(subscribers) = inner.by_project.get_mut(project_id) {
            subscribers.remove(&connection);
            if subscribers.is_empty() {
                inner.by_project.remove(project_id);
            }
        }
    }

    /// Validate, encode, and fan `envelope` out to every current
    /// subscriber of `envelope.project_id`. A subscriber whose queue has
    /// already been dropped (connection closed) is pruned; this never
    /// blocks on a slow reader — that's the writer task's problem,
    /// bounded by [`WRITE_BUDGET`]. Returns the validation error, if any,
    /// so the caller can log it with context the hub doesn't have.
    pub fn broadcast(&self, envelope: Envelope) -> Result<(), EnvelopeError> {
        envelope.validate()?;
        let text = match serde_json::to_string(&envelope) {
            Ok(text) => text,
            Err(_) => return Err(EnvelopeError::SerializationFailed),
        };

        let mut inner = self.inner.write();
        let Some(subscribers) = inner.by_project.get_mut(&envelope.project_id) else {
            return Ok(());
        };
        subscribers.retain(|connection, tx| match tx.send(Message::Text(text.clone().into())) {
            Ok(()) => true,
            Err(_) => {
                warn!(project_id = %envelope.project_id, connection = connection.0, "dropping subscriber with a closed queue");
                false
            }
        });
        if subscribers.is_empty() {
            inner.by_project.remove(&envelope.project_id);
        }
        Ok(())
    }

    pub fn subscriber_count(&self, project_id: &str) -> usize {
        self.inner.read().by_project.get(project_id).map(HashMap::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devteam_wire::EnvelopeType;
    use serde_json::json;

    fn envelope(project_id: &str) -> Envelope {
        Envelope::new(EnvelopeType::ExecutionUpdate, "2026-01-01T00:00:00Z", project_id, json!({"progress": 10}))
    }

    #[test]
    fn broadcast_reaches_every_subscriber_of_the_project() {
        let hub = Hub::new();
        let (_id_a, mut rx_a) = hub.subscribe("acme/widgets");
        let (_id_b, mut rx_b) = hub.subscribe("acme/widgets");
        let (_id_c, mut rx_other) = hub.subscribe("acme/other");

        hub.broadcast(envelope("acme/widgets")).unwrap();

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_other.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_removes_the_connection_and_empties_the_project_entry() {
        let hub = Hub::new();
        let (id, _rx) = hub.subscribe("acme/widgets");
        assert_eq!(hub.subscriber_count("acme/widgets"), 1);

        hub.unsubscribe("acme/widgets", id);
        assert_eq!(hub.subscriber_count("acme/widgets"), 0);
    }

    #[test]
    fn broadcast_prunes_a_subscriber_whose_receiver_was_dropped() {
        let hub = Hub::new();
        let (_id, rx) = hub.subscribe("acme/widgets");
        drop(rx);

        hub.broadcast(envelope("acme/widgets")).unwrap();
        assert_eq!(hub.subscriber_count("acme/widgets"), 0);
    }

    #[test]
    fn broadcast_to_an_unknown_project_is_a_harmless_no_op() {
        let hub = Hub::new();
        hub.broadcast(envelope("nobody/subscribed")).unwrap();
    }

    #[test]
    fn broadcast_rejects_a_non_utc_timestamp() {
        let hub = Hub::new();
        let env = Envelope::new(EnvelopeType::Error, "2026-01-01T00:00:00+02:00", "acme/widgets", json!({}));
        assert_eq!(hub.broadcast(env), Err(EnvelopeError::TimestampNotUtc));
    }
}
