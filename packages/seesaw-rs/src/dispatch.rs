//! Topic routing from envelopes to effects.
//!
//! The dispatcher owns the subscription table. Each topic maps to an ordered
//! list of effects; a delivery runs them one after another and collects the
//! events they return.
//!
//! # Failure isolation
//!
//! An effect that returns `Err` or panics does not stop the remaining
//! subscribers, and never stops the runtime. The failure is logged and
//! returned to the caller as a [`SeesawError`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

use crate::core::{Event, EventEnvelope};
use crate::effect_impl::{Effect, EffectContext};
use crate::error::SeesawError;

/// Result of delivering one envelope to all of its subscribers.
pub struct DispatchOutcome<E> {
    /// Events returned by subscribers, in subscription order.
    pub emitted: Vec<E>,
    /// Failures from subscribers that errored or panicked.
    pub failures: Vec<SeesawError>,
}

/// Routes events to the effects subscribed to their topic.
pub struct Dispatcher<E, D> {
    deps: Arc<D>,
    routes: HashMap<&'static str, Vec<Arc<dyn Effect<E, D>>>>,
}

impl<E: Event, D: Send + Sync + 'static> Dispatcher<E, D> {
    pub fn new(deps: Arc<D>) -> Self {
        Self {
            deps,
            routes: HashMap::new(),
        }
    }

    /// Subscribe an effect to every topic it declares.
    ///
    /// Fails if an effect with the same name already listens on one of them.
    pub fn subscribe<F>(&mut self, effect: F) -> Result<(), SeesawError>
    where
        F: Effect<E, D>,
    {
        let effect: Arc<dyn Effect<E, D>> = Arc::new(effect);
        let name = effect.name();

        for topic in effect.topics() {
            let subscribers = self.routes.entry(topic).or_default();
            if subscribers.iter().any(|existing| existing.name() == name) {
                return Err(SeesawError::DuplicateSubscription {
                    effect: name,
                    topic,
                });
            }
            subscribers.push(effect.clone());
            debug!(effect = name, topic, "effect subscribed");
        }

        Ok(())
    }

    /// Names of the effects listening on `topic`, in delivery order.
    pub fn subscribers(&self, topic: &str) -> Vec<&'static str> {
        self.routes
            .get(topic)
            .map(|effects| effects.iter().map(|e| e.name()).collect())
            .unwrap_or_default()
    }

    /// All topics with at least one subscriber.
    pub fn topics(&self) -> Vec<&'static str> {
        let mut topics: Vec<_> = self.routes.keys().copied().collect();
        topics.sort_unstable();
        topics
    }

    pub fn deps(&self) -> &Arc<D> {
        &self.deps
    }

    /// Deliver one envelope to every subscriber of its topic.
    pub async fn dispatch(&self, envelope: &EventEnvelope<E>) -> DispatchOutcome<E> {
        let topic = envelope.topic();
        let mut outcome = DispatchOutcome {
            emitted: Vec::new(),
            failures: Vec::new(),
        };

        let Some(effects) = self.routes.get(topic) else {
            debug!(topic, event_id = %envelope.id, "no subscribers for topic");
            return outcome;
        };

        for effect in effects {
            let ctx = EffectContext::new(self.deps.clone(), envelope.cid, envelope.id);
            let handled = AssertUnwindSafe(effect.handle(envelope.payload.clone(), ctx))
                .catch_unwind()
                .await;

            match handled {
                Ok(Ok(Some(event))) => {
                    debug!(
                        effect = effect.name(),
                        topic,
                        emits = event.topic(),
                        "effect returned event"
                    );
                    outcome.emitted.push(event);
                }
                Ok(Ok(None)) => {
                    debug!(effect = effect.name(), topic, "effect returned no event");
                }
                Ok(Err(source)) => {
                    error!(effect = effect.name(), topic, error = %source, "effect failed");
                    outcome.failures.push(SeesawError::EffectFailed {
                        effect: effect.name(),
                        topic,
                        cid: envelope.cid,
                        source,
                    });
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(effect = effect.name(), topic, panic = %message, "effect panicked");
                    outcome.failures.push(SeesawError::EffectPanicked {
                        effect: effect.name(),
                        topic,
                        message,
                    });
                }
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
