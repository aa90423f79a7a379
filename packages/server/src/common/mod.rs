// Common types shared across the application

pub mod entity_ids;
pub mod errors;
pub mod id;

pub use entity_ids::*;
pub use errors::{AdapterError, PipelineError, StoreError};
pub use id::Id;
