//! Event taps: observe facts without deciding or emitting.
//!
//! Taps run **after** an envelope's subscribers have finished and the events
//! they returned were enqueued. Every envelope reaches every tap, including
//! topics nobody subscribes to (terminal facts such as `done`).
//!
//! | Role   | Purpose          | Can mutate? | Can emit? |
//! |--------|------------------|-------------|-----------|
//! | Effect | Execute intent   | yes         | returns   |
//! | Tap    | Observe facts    | no          | no        |
//!
//! # Example
//!
//! ```ignore
//! pub struct LogTap;
//!
//! #[async_trait]
//! impl EventTap<OrderEvent> for LogTap {
//!     async fn on_event(&self, envelope: &EventEnvelope<OrderEvent>) -> Result<()> {
//!         info!(topic = envelope.topic(), cid = %envelope.cid, "observed");
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{trace, warn};

use crate::core::{Event, EventEnvelope};

/// Read-only observer of every envelope the runtime handles.
#[async_trait]
pub trait EventTap<E>: Send + Sync + 'static {
    /// Observe one envelope. Errors are logged and ignored.
    async fn on_event(&self, envelope: &EventEnvelope<E>) -> Result<()>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered collection of taps.
pub(crate) struct TapRegistry<E> {
    taps: Vec<Arc<dyn EventTap<E>>>,
}

impl<E: Event> TapRegistry<E> {
    pub(crate) fn new() -> Self {
        Self { taps: Vec::new() }
    }

    pub(crate) fn register<T: EventTap<E>>(&mut self, tap: T) {
        self.taps.push(Arc::new(tap));
    }

    pub(crate) fn len(&self) -> usize {
        self.taps.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Run every tap in registration order.
    pub(crate) async fn run_all(&self, envelope: &EventEnvelope<E>) {
        for tap in &self.taps {
            let started = Instant::now();
            if let Err(e) = tap.on_event(envelope).await {
                warn!(
                    tap = tap.name(),
                    topic = envelope.topic(),
                    cid = %envelope.cid,
                    error = %e,
                    "event tap failed"
                );
            }
            trace!(
                tap = tap.name(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "tap finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CorrelationId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct Ping;

    impl Event for Ping {
        fn topic(&self) -> &'static str {
            "ping"
        }
    }

    struct CountingTap(Arc<AtomicUsize>);

    #[async_trait]
    impl EventTap<Ping> for CountingTap {
        async fn on_event(&self, _envelope: &EventEnvelope<Ping>) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingTap;

    #[async_trait]
    impl EventTap<Ping> for FailingTap {
        async fn on_event(&self, _envelope: &EventEnvelope<Ping>) -> Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[tokio::test]
    async fn test_failing_tap_does_not_skip_later_taps() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = TapRegistry::new();
        registry.register(FailingTap);
        registry.register(CountingTap(count.clone()));
        assert_eq!(registry.len(), 2);

        registry
            .run_all(&EventEnvelope::new(CorrelationId::new(), Ping))
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
