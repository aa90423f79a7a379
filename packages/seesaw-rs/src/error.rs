//! Structured error types for seesaw.
//!
//! `SeesawError` provides pattern-matchable errors instead of generic
//! `anyhow::Error` for failures that belong to the engine itself.
//!
//! # The Error Boundary Rule
//!
//! > **No `anyhow::Error` ever crosses the EventBus boundary.**
//!
//! Effects use `anyhow` internally. If a domain wants failures to flow
//! through the pipeline, it models them as events; errors returned from an
//! effect are logged, reported to the error hook, and surfaced to
//! `emit_and_await` callers, but never re-emitted.

use std::time::Duration;

use thiserror::Error;

use crate::core::CorrelationId;

#[derive(Debug, Error)]
pub enum SeesawError {
    /// The runtime is gone; the event could not be enqueued.
    #[error("event bus closed: topic '{topic}' could not be delivered")]
    BusClosed { topic: &'static str },

    /// `emit_and_await` gave up before the cascade settled.
    #[error("timed out after {duration:?} waiting for correlated work to settle")]
    Timeout { duration: Duration },

    /// The same effect was registered twice for one topic.
    #[error("effect '{effect}' is already subscribed to topic '{topic}'")]
    DuplicateSubscription {
        effect: &'static str,
        topic: &'static str,
    },

    /// An effect panicked while handling an event.
    #[error("effect '{effect}' panicked handling '{topic}': {message}")]
    EffectPanicked {
        effect: &'static str,
        topic: &'static str,
        message: String,
    },

    /// An effect returned an error while handling an event.
    #[error("effect '{effect}' failed handling '{topic}' (cid {cid}): {source}")]
    EffectFailed {
        effect: &'static str,
        topic: &'static str,
        cid: CorrelationId,
        #[source]
        source: anyhow::Error,
    },
}
