//! Event bus feeding the runtime.
//!
//! # Guarantees
//!
//! - **Delivered once**: every envelope is handed to the runtime exactly once
//!   (an unbounded FIFO, not a broadcast channel; nothing lags or drops)
//! - **FIFO**: envelopes are dispatched in the order they were enqueued
//! - **In-memory only**: durability belongs to entity status fields
//!
//! Observers that need to see every fact register an [`EventTap`](crate::EventTap)
//! instead of subscribing to the bus.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::core::{CorrelationId, Event, EventEnvelope, EventId};
use crate::error::SeesawError;
use crate::inflight::InflightTracker;

/// Handle for enqueuing events.
///
/// Cloning is cheap; all clones feed the same runtime.
pub struct EventBus<E> {
    sender: mpsc::UnboundedSender<EventEnvelope<E>>,
    inflight: Arc<InflightTracker>,
}

impl<E: Event> EventBus<E> {
    /// Create a bus and the receiving half the runtime consumes.
    pub fn new(
        inflight: Arc<InflightTracker>,
    ) -> (Self, mpsc::UnboundedReceiver<EventEnvelope<E>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, inflight }, receiver)
    }

    /// Emit an event under a fresh correlation ID (fire-and-forget).
    ///
    /// Returns the correlation ID so callers can log or await it later.
    pub fn emit(&self, event: E) -> Result<CorrelationId, SeesawError> {
        let cid = CorrelationId::new();
        self.emit_with_correlation(event, cid)?;
        Ok(cid)
    }

    /// Emit an event that belongs to an existing correlation.
    pub fn emit_with_correlation(
        &self,
        event: E,
        cid: CorrelationId,
    ) -> Result<EventId, SeesawError> {
        self.emit_envelope(EventEnvelope::new(cid, event))
    }

    /// Enqueue a pre-built envelope.
    ///
    /// The envelope is counted as inflight *before* it is sent, so the
    /// runtime can never finish it before the count exists.
    pub fn emit_envelope(&self, envelope: EventEnvelope<E>) -> Result<EventId, SeesawError> {
        let id = envelope.id;
        let cid = envelope.cid;
        let topic = envelope.topic();

        self.inflight.inc(cid, 1);
        if self.sender.send(envelope).is_err() {
            self.inflight.dec(cid, 1);
            return Err(SeesawError::BusClosed { topic });
        }

        trace!(topic, %cid, event_id = %id, "event enqueued");
        Ok(id)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            inflight: self.inflight.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestEvent {
        value: i32,
    }

    impl Event for TestEvent {
        fn topic(&self) -> &'static str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_emit_and_receive_in_order() {
        let inflight = Arc::new(InflightTracker::new());
        let (bus, mut receiver) = EventBus::new(inflight);

        for value in 0..3 {
            bus.emit(TestEvent { value }).unwrap();
        }

        for value in 0..3 {
            let envelope = receiver.recv().await.unwrap();
            assert_eq!(envelope.payload, TestEvent { value });
        }
    }

    #[tokio::test]
    async fn test_emit_counts_inflight() {
        let inflight = Arc::new(InflightTracker::new());
        let (bus, _receiver) = EventBus::new(inflight.clone());

        let cid = bus.emit(TestEvent { value: 1 }).unwrap();
        assert!(inflight.has_pending_work(cid));
    }

    #[tokio::test]
    async fn test_emit_with_correlation_keeps_cid() {
        let inflight = Arc::new(InflightTracker::new());
        let (bus, mut receiver) = EventBus::new(inflight);

        let cid = CorrelationId::new();
        let id = bus
            .emit_with_correlation(TestEvent { value: 7 }, cid)
            .unwrap();

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.cid, cid);
        assert_eq!(envelope.id, id);
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_fails_and_uncounts() {
        let inflight = Arc::new(InflightTracker::new());
        let (bus, receiver) = EventBus::new(inflight.clone());
        drop(receiver);

        let cid = CorrelationId::new();
        let err = bus
            .emit_with_correlation(TestEvent { value: 1 }, cid)
            .unwrap_err();
        assert!(matches!(err, SeesawError::BusClosed { topic: "test" }));
        assert!(!inflight.has_pending_work(cid));
        assert!(bus.is_closed());
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let inflight = Arc::new(InflightTracker::new());
        let (bus1, mut receiver) = EventBus::new(inflight);
        let bus2 = bus1.clone();

        bus2.emit(TestEvent { value: 55 }).unwrap();

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.payload.value, 55);
    }
}
