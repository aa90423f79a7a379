//! Runtime loop: pulls envelopes off the bus and hands them to effects.
//!
//! For each envelope the runtime:
//! 1. Dispatches it to every subscriber of its topic
//! 2. Emits whatever the subscribers returned, under the same correlation ID
//! 3. Runs the event taps
//! 4. Releases the envelope's inflight count
//!
//! Envelopes that share a [`key`](crate::Event::key) are handled one at a
//! time, in arrival order. Each key gets a queue drained by a single task;
//! envelopes with different keys (or no key) run concurrently.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::bus::EventBus;
use crate::core::{Event, EventEnvelope};
use crate::dispatch::Dispatcher;
use crate::error::SeesawError;
use crate::inflight::{InflightGuard, InflightTracker};
use crate::tap::TapRegistry;

/// Callback invoked for every effect failure.
pub type ErrorHook = Arc<dyn Fn(&SeesawError) + Send + Sync>;

/// Pending envelopes per serialization key.
///
/// A key is present in the map exactly while a task is draining it.
struct KeyedQueues<E> {
    queues: DashMap<String, VecDeque<EventEnvelope<E>>>,
}

impl<E> KeyedQueues<E> {
    fn new() -> Self {
        Self {
            queues: DashMap::new(),
        }
    }

    /// Queue behind the active drainer, or hand the envelope back when the
    /// caller must start draining this key itself.
    fn enqueue(&self, key: &str, envelope: EventEnvelope<E>) -> Option<EventEnvelope<E>> {
        match self.queues.entry(key.to_string()) {
            Entry::Occupied(mut pending) => {
                pending.get_mut().push_back(envelope);
                None
            }
            Entry::Vacant(slot) => {
                slot.insert(VecDeque::new());
                Some(envelope)
            }
        }
    }

    /// Next envelope for `key`; releases the key when its queue is empty.
    fn next(&self, key: &str) -> Option<EventEnvelope<E>> {
        match self.queues.entry(key.to_string()) {
            Entry::Occupied(mut pending) => match pending.get_mut().pop_front() {
                Some(envelope) => Some(envelope),
                None => {
                    pending.remove();
                    None
                }
            },
            Entry::Vacant(_) => None,
        }
    }

    fn active_keys(&self) -> usize {
        self.queues.len()
    }
}

struct Shared<E, D> {
    dispatcher: Dispatcher<E, D>,
    taps: TapRegistry<E>,
    bus: EventBus<E>,
    inflight: Arc<InflightTracker>,
    on_error: Option<ErrorHook>,
    keyed: KeyedQueues<E>,
}

impl<E: Event, D: Send + Sync + 'static> Shared<E, D> {
    async fn drain_key(self: Arc<Self>, key: String, first: EventEnvelope<E>) {
        let mut next = Some(first);
        while let Some(envelope) = next {
            self.handle_isolated(envelope).await;
            next = self.keyed.next(&key);
        }
        debug!(key = %key, "key drained");
    }

    /// Handle one envelope; a panic outside the effects is logged, not
    /// propagated, so a key queue is never left without a drainer.
    async fn handle_isolated(&self, envelope: EventEnvelope<E>) {
        let topic = envelope.topic();
        let cid = envelope.cid;
        if AssertUnwindSafe(self.handle(envelope))
            .catch_unwind()
            .await
            .is_err()
        {
            error!(topic, %cid, "panic while handling envelope");
        }
    }

    async fn handle(&self, envelope: EventEnvelope<E>) {
        // Released last, after children were counted and taps ran.
        let _guard = InflightGuard::for_event(self.inflight.clone(), envelope.cid);

        let outcome = self.dispatcher.dispatch(&envelope).await;

        for failure in outcome.failures {
            if let Some(hook) = &self.on_error {
                (hook.as_ref())(&failure);
            }
            self.inflight
                .record_error(envelope.cid, anyhow::Error::new(failure));
        }

        for event in outcome.emitted {
            let emitted_topic = event.topic();
            if let Err(e) = self.bus.emit_with_correlation(event, envelope.cid) {
                error!(
                    topic = emitted_topic,
                    cid = %envelope.cid,
                    error = %e,
                    "failed to emit returned event"
                );
                self.inflight.record_error(envelope.cid, anyhow::Error::new(e));
            }
        }

        if !self.taps.is_empty() {
            self.taps.run_all(&envelope).await;
        }
    }
}

/// The event loop. Usually started through [`Engine::start`](crate::Engine::start).
pub struct Runtime<E, D> {
    shared: Arc<Shared<E, D>>,
    receiver: mpsc::UnboundedReceiver<EventEnvelope<E>>,
}

impl<E: Event, D: Send + Sync + 'static> Runtime<E, D> {
    pub(crate) fn new(
        dispatcher: Dispatcher<E, D>,
        taps: TapRegistry<E>,
        bus: EventBus<E>,
        receiver: mpsc::UnboundedReceiver<EventEnvelope<E>>,
        inflight: Arc<InflightTracker>,
        on_error: Option<ErrorHook>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                taps,
                bus,
                inflight,
                on_error,
                keyed: KeyedQueues::new(),
            }),
            receiver,
        }
    }

    pub fn bus(&self) -> &EventBus<E> {
        &self.shared.bus
    }

    /// Number of keys with a task currently draining them.
    pub fn active_keys(&self) -> usize {
        self.shared.keyed.active_keys()
    }

    /// Run until the bus closes (or the task is aborted).
    pub async fn run(mut self) {
        info!(
            topics = ?self.shared.dispatcher.topics(),
            taps = self.shared.taps.len(),
            "seesaw runtime starting"
        );

        while let Some(envelope) = self.receiver.recv().await {
            let shared = self.shared.clone();
            match envelope.key() {
                Some(key) => {
                    if let Some(first) = shared.keyed.enqueue(&key, envelope) {
                        tokio::spawn(shared.drain_key(key, first));
                    }
                }
                None => {
                    tokio::spawn(async move { shared.handle_isolated(envelope).await });
                }
            }
        }

        info!("event bus closed, seesaw runtime stopped");
    }
}

impl<E, D> std::fmt::Debug for Runtime<E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("active_keys", &self.shared.keyed.queues.len())
            .finish_non_exhaustive()
    }
}
