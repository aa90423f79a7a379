//! Pipeline effects
//!
//! ```text
//! submitted → resolve → resolved → list → listed → improve → improved → notify → done
//!                │                   │                │                   │
//!                └─ resolve-failed   └─ list-failed   └─ improve-failed   └─ notify-failed
//!                                         ↓ (all four)
//!                                  error_notifier → error-notified
//! ```

pub mod error_notifier;
pub mod executor;
pub mod improve;
pub mod list;
pub mod notify;
pub mod resolve;

pub use error_notifier::ErrorNotifier;
pub use executor::{Stage, StageExecutor, Trigger};
pub use improve::ImproveStage;
pub use list::ListStage;
pub use notify::NotifyStage;
pub use resolve::ResolveStage;
