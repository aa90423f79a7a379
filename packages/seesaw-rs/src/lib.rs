//! # Seesaw
//!
//! A topic-routed, event-driven coordination layer where effects react to
//! facts and the runtime is the sole emitter.
//!
//! ## Core Concepts
//!
//! - [`Event`] = a fact, published on a topic
//! - [`Effect`] = a handler subscribed to topics; it performs IO and
//!   **returns** the next fact instead of emitting it
//! - [`EventTap`] = a read-only observer of every fact
//!
//! ## Architecture
//!
//! ```text
//! Edge (HTTP handler)
//!     │
//!     ▼ emit()
//! EventBus (unbounded FIFO) ─────────────────────┐
//!     │                                          │
//!     ▼ recv()                                   │
//! Runtime.run() loop                             │
//!     │  per-key queue (one task per key)        │
//!     ▼                                          │
//! Dispatcher ─► Effect.handle() ─► Some(event) ──┘
//!     │
//!     ▼
//! Taps (observe)
//! ```
//!
//! ## Guarantees
//!
//! - **Delivered once**: each envelope reaches the runtime exactly once
//! - **Per-key order**: envelopes with the same [`Event::key`] are handled one
//!   at a time, in arrival order
//! - **Failure isolation**: an effect error or panic is logged and reported,
//!   never fatal to the runtime
//! - **Correlation**: returned events inherit the trigger's [`CorrelationId`],
//!   so [`EngineHandle::emit_and_await`] can wait for a whole cascade
//! - **In-memory only**: durability belongs to the domain's stores
//!
//! ## Example
//!
//! ```ignore
//! use seesaw::{async_trait, Effect, EffectContext, EngineBuilder, Event};
//!
//! #[derive(Debug, Clone)]
//! enum OrderEvent {
//!     Placed { order_id: u64 },
//!     Shipped { order_id: u64 },
//! }
//!
//! impl Event for OrderEvent {
//!     fn topic(&self) -> &'static str {
//!         match self {
//!             OrderEvent::Placed { .. } => "placed",
//!             OrderEvent::Shipped { .. } => "shipped",
//!         }
//!     }
//! }
//!
//! struct Ship;
//!
//! #[async_trait]
//! impl Effect<OrderEvent, Deps> for Ship {
//!     fn topics(&self) -> Vec<&'static str> {
//!         vec!["placed"]
//!     }
//!
//!     async fn handle(&self, event: OrderEvent, ctx: EffectContext<Deps>) -> anyhow::Result<Option<OrderEvent>> {
//!         let OrderEvent::Placed { order_id } = event else { return Ok(None) };
//!         ctx.deps().warehouse.ship(order_id).await?;
//!         Ok(Some(OrderEvent::Shipped { order_id }))
//!     }
//! }
//!
//! let handle = EngineBuilder::new(deps).with_effect(Ship).build()?.start();
//! handle.emit(OrderEvent::Placed { order_id: 7 })?;
//! ```

mod bus;
mod core;
mod dispatch;
mod effect_impl;
mod engine;
mod error;
mod inflight;
mod runtime;
mod tap;

#[cfg(feature = "testing")]
pub mod testing;

pub use crate::core::{CorrelationId, Event, EventEnvelope, EventId};
pub use crate::error::SeesawError;
pub use bus::EventBus;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use effect_impl::{Effect, EffectContext};
pub use engine::{Engine, EngineBuilder, EngineHandle};
pub use inflight::{InflightTracker, WaiterGuard};
pub use runtime::{ErrorHook, Runtime};
pub use tap::EventTap;

pub use async_trait::async_trait;
