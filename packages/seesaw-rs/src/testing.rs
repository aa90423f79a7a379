//! Testing utilities for seesaw engines.
//!
//! Only available with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! seesaw = { path = "../seesaw-rs", features = ["testing"] }
//! ```
//!
//! # Recording a cascade
//!
//! ```ignore
//! use seesaw::testing::RecordingTap;
//!
//! let recorder = RecordingTap::new();
//! let handle = EngineBuilder::new(deps)
//!     .with_effect(ResolveEffect)
//!     .with_event_tap(recorder.clone())
//!     .build()?
//!     .start();
//!
//! handle.emit_and_await(event).await?;
//! assert_eq!(recorder.topics(), vec!["submitted", "resolved"]);
//! ```

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{Event, EventEnvelope};
use crate::tap::EventTap;

/// Tap that keeps every envelope it observes.
///
/// Clones share the same recording.
pub struct RecordingTap<E> {
    seen: Arc<Mutex<Vec<EventEnvelope<E>>>>,
}

impl<E: Event> RecordingTap<E> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Envelopes in the order the runtime finished them.
    pub fn envelopes(&self) -> Vec<EventEnvelope<E>> {
        self.lock().clone()
    }

    pub fn events(&self) -> Vec<E> {
        self.lock().iter().map(|e| e.payload.clone()).collect()
    }

    pub fn topics(&self) -> Vec<&'static str> {
        self.lock().iter().map(|e| e.topic()).collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.lock().iter().filter(|e| e.topic() == topic).count()
    }

    /// Events whose key matches, e.g. everything for one job.
    pub fn events_for_key(&self, key: &str) -> Vec<E> {
        self.lock()
            .iter()
            .filter(|e| e.key().as_deref() == Some(key))
            .map(|e| e.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventEnvelope<E>>> {
        match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<E: Event> Default for RecordingTap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for RecordingTap<E> {
    fn clone(&self) -> Self {
        Self {
            seen: self.seen.clone(),
        }
    }
}

#[async_trait]
impl<E: Event> EventTap<E> for RecordingTap<E> {
    async fn on_event(&self, envelope: &EventEnvelope<E>) -> Result<()> {
        self.lock().push(envelope.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording_tap"
    }
}
