//! Core types for the seesaw event-driven architecture.
//!
//! # Overview
//!
//! Events are **facts**: immutable descriptions of something that happened.
//! Every event names the topic it is published on, and optionally a key that
//! groups related events (for example, all events belonging to one job).
//!
//! Events with the same key are handled strictly one at a time, in the order
//! they were emitted. Events with different keys may be handled concurrently.
//!
//! # Correlation
//!
//! Every envelope carries a [`CorrelationId`]. Events returned by an effect
//! inherit the correlation ID of the event that triggered the effect, so the
//! whole cascade started by one emission can be tracked and awaited.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fact published on a topic.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// enum OrderEvent {
///     Placed { order_id: Uuid },
///     Shipped { order_id: Uuid },
/// }
///
/// impl Event for OrderEvent {
///     fn topic(&self) -> &'static str {
///         match self {
///             OrderEvent::Placed { .. } => "placed",
///             OrderEvent::Shipped { .. } => "shipped",
///         }
///     }
///
///     fn key(&self) -> Option<String> {
///         match self {
///             OrderEvent::Placed { order_id } | OrderEvent::Shipped { order_id } => {
///                 Some(order_id.to_string())
///             }
///         }
///     }
/// }
/// ```
pub trait Event: Clone + fmt::Debug + Send + Sync + 'static {
    /// The topic this event is published on.
    fn topic(&self) -> &'static str;

    /// Serialization key.
    ///
    /// Events sharing a key never run concurrently. `None` means the event
    /// has no ordering constraint with any other event.
    fn key(&self) -> Option<String> {
        None
    }
}

/// Correlation ID for tracking related events.
///
/// Use `CorrelationId::NONE` for uncorrelated events, or `CorrelationId::new()`
/// to generate a fresh ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Sentinel value for uncorrelated events.
    pub const NONE: Self = Self(Uuid::nil());

    /// Create a new random correlation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Check if this is the NONE sentinel value.
    pub fn is_none(&self) -> bool {
        self.0.is_nil()
    }

    /// Check if this is a real correlation ID (not NONE).
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }

    /// Get the inner UUID value.
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CorrelationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Unique identity of one emission.
///
/// Two emissions of an identical payload get different `EventId`s; the
/// runtime delivers each `EventId` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope wrapping an event with transport metadata.
///
/// Domain event enums stay clean; identity, correlation and timing are
/// transport-level concerns.
#[derive(Debug, Clone)]
pub struct EventEnvelope<E> {
    /// Identity of this emission.
    pub id: EventId,
    /// Correlation ID for tracking related work.
    pub cid: CorrelationId,
    /// The event payload.
    pub payload: E,
    /// When the event was enqueued.
    pub emitted_at: DateTime<Utc>,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap an event with the given correlation ID.
    pub fn new(cid: CorrelationId, payload: E) -> Self {
        Self {
            id: EventId::new(),
            cid,
            payload,
            emitted_at: Utc::now(),
        }
    }

    /// Topic of the wrapped event.
    pub fn topic(&self) -> &'static str {
        self.payload.topic()
    }

    /// Serialization key of the wrapped event.
    pub fn key(&self) -> Option<String> {
        self.payload.key()
    }
}
