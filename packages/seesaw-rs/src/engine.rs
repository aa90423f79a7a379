//! Engine: builder, runtime task, and the handle edges use to emit.
//!
//! # Example
//!
//! ```ignore
//! let handle = EngineBuilder::new(deps)
//!     .with_effect(ResolveEffect)
//!     .with_effect(ListEffect)
//!     .with_event_tap(AuditTap)
//!     .on_error(|e| tracing::error!(error = %e, "effect failed"))
//!     .build()?
//!     .start();
//!
//! // Fire-and-forget from an HTTP handler
//! handle.emit(OrderEvent::Placed { order_id })?;
//!
//! // Or wait for the whole cascade (tests, CLIs)
//! handle.emit_and_await(OrderEvent::Placed { order_id }).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::bus::EventBus;
use crate::core::{CorrelationId, Event};
use crate::dispatch::Dispatcher;
use crate::effect_impl::Effect;
use crate::error::SeesawError;
use crate::inflight::InflightTracker;
use crate::runtime::{ErrorHook, Runtime};
use crate::tap::{EventTap, TapRegistry};

const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fluent builder for an [`Engine`].
///
/// Subscription errors are remembered and returned from [`build`](Self::build)
/// so the builder chain stays infallible.
pub struct EngineBuilder<E, D> {
    dispatcher: Dispatcher<E, D>,
    taps: TapRegistry<E>,
    on_error: Option<ErrorHook>,
    first_error: Option<SeesawError>,
}

impl<E: Event, D: Send + Sync + 'static> EngineBuilder<E, D> {
    pub fn new(deps: D) -> Self {
        Self::with_arc(Arc::new(deps))
    }

    /// Build over dependencies that are already shared.
    pub fn with_arc(deps: Arc<D>) -> Self {
        Self {
            dispatcher: Dispatcher::new(deps),
            taps: TapRegistry::new(),
            on_error: None,
            first_error: None,
        }
    }

    pub fn with_effect<F: Effect<E, D>>(mut self, effect: F) -> Self {
        if let Err(e) = self.dispatcher.subscribe(effect) {
            self.first_error.get_or_insert(e);
        }
        self
    }

    pub fn with_event_tap<T: EventTap<E>>(mut self, tap: T) -> Self {
        self.taps.register(tap);
        self
    }

    /// Called for every effect error or panic, in addition to logging.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SeesawError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<Engine<E, D>, SeesawError> {
        if let Some(e) = self.first_error {
            return Err(e);
        }

        let inflight = Arc::new(InflightTracker::new());
        let (bus, receiver) = EventBus::new(inflight.clone());
        let runtime = Runtime::new(
            self.dispatcher,
            self.taps,
            bus.clone(),
            receiver,
            inflight.clone(),
            self.on_error,
        );

        Ok(Engine {
            runtime,
            bus,
            inflight,
        })
    }
}

/// A built engine that has not started processing yet.
///
/// Events emitted before [`start`](Self::start) are queued and handled once
/// the runtime runs.
pub struct Engine<E, D> {
    runtime: Runtime<E, D>,
    bus: EventBus<E>,
    inflight: Arc<InflightTracker>,
}

impl<E: Event, D: Send + Sync + 'static> Engine<E, D> {
    pub fn builder(deps: D) -> EngineBuilder<E, D> {
        EngineBuilder::new(deps)
    }

    pub fn bus(&self) -> &EventBus<E> {
        &self.bus
    }

    /// Spawn the runtime on the current tokio runtime.
    pub fn start(self) -> EngineHandle<E> {
        let task = tokio::spawn(self.runtime.run());
        debug!("seesaw engine started");

        EngineHandle {
            bus: self.bus,
            inflight: self.inflight,
            task: task.abort_handle(),
        }
    }
}

/// Handle to a running engine. Cheap to clone.
#[derive(Clone)]
pub struct EngineHandle<E> {
    bus: EventBus<E>,
    inflight: Arc<InflightTracker>,
    task: AbortHandle,
}

impl<E: Event> EngineHandle<E> {
    pub fn bus(&self) -> &EventBus<E> {
        &self.bus
    }

    pub fn inflight(&self) -> &Arc<InflightTracker> {
        &self.inflight
    }

    /// Emit under a fresh correlation ID without waiting.
    pub fn emit(&self, event: E) -> Result<CorrelationId, SeesawError> {
        self.bus.emit(event)
    }

    /// Emit and wait until every event in the resulting cascade was handled.
    ///
    /// Returns the first effect error recorded for the cascade.
    pub async fn emit_and_await(&self, event: E) -> Result<CorrelationId> {
        self.emit_and_await_timeout(event, DEFAULT_AWAIT_TIMEOUT)
            .await
    }

    pub async fn emit_and_await_timeout(
        &self,
        event: E,
        timeout: Duration,
    ) -> Result<CorrelationId> {
        let cid = CorrelationId::new();

        // Register before emitting so an error recorded by a fast cascade
        // is still there when wait_zero looks.
        let _waiter = self.inflight.register_waiter(cid);
        self.bus.emit_with_correlation(event, cid)?;

        match tokio::time::timeout(timeout, self.inflight.wait_zero(cid)).await {
            Ok(settled) => settled.map(|()| cid),
            Err(_) => {
                self.inflight.forget(cid);
                Err(SeesawError::Timeout { duration: timeout }.into())
            }
        }
    }

    /// Stop the runtime loop. Handlers already running finish on their own.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<E> std::fmt::Debug for EngineHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("inflight", &self.inflight)
            .finish_non_exhaustive()
    }
}
