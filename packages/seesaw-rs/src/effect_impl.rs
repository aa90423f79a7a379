//! Effect trait and context for event handling.
//!
//! Effects are the units of work that react to facts. An effect subscribes
//! to one or more topics, performs IO, and **returns** the event describing
//! the outcome. The runtime is the sole emitter: it publishes whatever the
//! effect returned under the triggering event's correlation ID.
//!
//! # Key Properties
//!
//! - **Stateless**: events carry the data an effect needs; durable state lives
//!   in the domain's stores
//! - **Return, don't emit**: `handle` returns `Option<E>`; there is no bus on
//!   the context
//! - **Narrow context**: only `deps()` and correlation metadata

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::{CorrelationId, EventId};

/// Context passed to effect handlers.
///
/// Immutable and cheap to clone.
pub struct EffectContext<D> {
    deps: Arc<D>,
    cid: CorrelationId,
    event_id: EventId,
}

impl<D> EffectContext<D> {
    /// Build a context for one delivery.
    ///
    /// The runtime does this for every dispatch; tests may call it directly to
    /// drive an effect without an engine.
    pub fn new(deps: Arc<D>, cid: CorrelationId, event_id: EventId) -> Self {
        Self {
            deps,
            cid,
            event_id,
        }
    }

    /// Shared dependencies (stores, adapters, configuration).
    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Correlation ID of the triggering event.
    pub fn correlation_id(&self) -> CorrelationId {
        self.cid
    }

    /// Identity of the triggering emission.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }
}

impl<D> Clone for EffectContext<D> {
    fn clone(&self) -> Self {
        Self {
            deps: self.deps.clone(),
            cid: self.cid,
            event_id: self.event_id,
        }
    }
}

/// Handler for events published on a set of topics.
///
/// # Example
///
/// ```ignore
/// struct ShipOrder;
///
/// #[async_trait]
/// impl Effect<OrderEvent, Deps> for ShipOrder {
///     fn topics(&self) -> Vec<&'static str> {
///         vec!["placed"]
///     }
///
///     async fn handle(&self, event: OrderEvent, ctx: EffectContext<Deps>) -> Result<Option<OrderEvent>> {
///         let OrderEvent::Placed { order_id } = event else { return Ok(None) };
///         ctx.deps().warehouse.ship(order_id).await?;
///         Ok(Some(OrderEvent::Shipped { order_id }))
///     }
/// }
/// ```
#[async_trait]
pub trait Effect<E, D>: Send + Sync + 'static {
    /// Topics this effect subscribes to.
    fn topics(&self) -> Vec<&'static str>;

    /// Human-readable name for logs and duplicate detection.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Handle one delivery.
    ///
    /// `Ok(Some(event))` publishes `event`; `Ok(None)` publishes nothing.
    /// `Err` is logged and reported to the engine's error hook.
    async fn handle(&self, event: E, ctx: EffectContext<D>) -> Result<Option<E>>;
}
