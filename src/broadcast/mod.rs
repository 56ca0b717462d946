// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-weighbridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Event fan-out to connected observers
//!
//! The broadcaster owns the set of observer channels. Both input loops
//! publish through it; the observer gateway registers one channel per
//! WebSocket connection. Delivery is best-effort: an observer whose
//! channel has gone away is dropped from the set without affecting the
//! publish call or the other observers.
//!
//! A newly registered observer immediately receives the current weight
//! snapshot when one exists, so late joiners do not have to wait for the
//! next scale line.

pub mod event;

pub use event::{OutboundEvent, SignalKind};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

use crate::weight::WeightStore;

/// Identifier assigned to one registered observer.
pub type ObserverId = u64;

/// Fan-out point between the input loops and the observer connections.
pub struct EventBroadcaster {
    store: Arc<WeightStore>,
    observers: Mutex<HashMap<ObserverId, UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    /// Create a broadcaster reading snapshots from the given store
    pub fn new(store: Arc<WeightStore>) -> Self {
        Self {
            store,
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new observer and return its event channel.
    ///
    /// If the store currently holds a valid weight, the corresponding
    /// `weightUpdate` message is queued to this observer before it can
    /// see any other traffic. An observer that connects before any weight
    /// was received gets no initial message.
    pub async fn register(&self) -> (ObserverId, UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(reading) = self.store.get().await {
            let snapshot = OutboundEvent::weight_update(reading.value);
            match serde_json::to_string(&snapshot) {
                Ok(payload) => {
                    // The receiver is still in scope, this cannot fail yet
                    let _ = tx.send(payload);
                }
                Err(e) => warn!("Failed to serialize snapshot for observer {}: {}", id, e),
            }
        }

        self.observers.lock().await.insert(id, tx);
        debug!("Observer {} registered", id);
        (id, rx)
    }

    /// Remove an observer on observer-initiated close or channel error
    pub async fn unregister(&self, id: ObserverId) {
        if self.observers.lock().await.remove(&id).is_some() {
            debug!("Observer {} unregistered", id);
        }
    }

    /// Serialize the event once and deliver it to every registered
    /// observer.
    ///
    /// Observers whose channel is no longer deliverable are pruned from
    /// the set; this never fails the publish for the remaining observers.
    /// Delivery order across observers is unspecified and unacknowledged.
    pub async fn publish(&self, event: &OutboundEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;

        let mut observers = self.observers.lock().await;
        let mut unreachable = Vec::new();
        for (id, tx) in observers.iter() {
            if tx.send(payload.clone()).is_err() {
                unreachable.push(*id);
            }
        }
        for id in unreachable {
            observers.remove(&id);
            warn!("Observer {} unreachable, dropped from broadcast set", id);
        }

        Ok(())
    }

    /// Number of currently registered observers
    pub async fn observer_count(&self) -> usize {
        self.observers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Arc<WeightStore>, EventBroadcaster) {
        let store = Arc::new(WeightStore::new());
        let broadcaster = EventBroadcaster::new(store.clone());
        (store, broadcaster)
    }

    #[tokio::test]
    async fn register_before_any_weight_sends_nothing() {
        let (_store, broadcaster) = fixture();
        let (_id, mut rx) = broadcaster.register().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn register_after_weight_sends_snapshot() {
        let (store, broadcaster) = fixture();
        store.set(12.34).await;

        let (_id, mut rx) = broadcaster.register().await;
        assert_eq!(
            rx.try_recv().unwrap(),
            r#"{"type":"weightUpdate","value":"12.34"}"#
        );
        // The snapshot is the only initial message
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_reaches_every_observer() {
        let (_store, broadcaster) = fixture();
        let (_a, mut rx_a) = broadcaster.register().await;
        let (_b, mut rx_b) = broadcaster.register().await;

        broadcaster
            .publish(&OutboundEvent::weight_update(7.0))
            .await
            .unwrap();

        let expected = r#"{"type":"weightUpdate","value":"7.00"}"#;
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn dead_observer_is_pruned_without_failing_publish() {
        let (_store, broadcaster) = fixture();
        let (_kept, mut rx_kept) = broadcaster.register().await;
        let (_gone, rx_gone) = broadcaster.register().await;
        drop(rx_gone);

        broadcaster
            .publish(&OutboundEvent::signal_trigger(SignalKind::Gross, 1.0))
            .await
            .unwrap();

        assert_eq!(broadcaster.observer_count().await, 1);
        assert!(rx_kept.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unregister_removes_observer() {
        let (_store, broadcaster) = fixture();
        let (id, _rx) = broadcaster.register().await;
        assert_eq!(broadcaster.observer_count().await, 1);

        broadcaster.unregister(id).await;
        assert_eq!(broadcaster.observer_count().await, 0);
    }
}
