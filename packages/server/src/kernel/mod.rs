//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod openai;
pub mod resend;
pub mod test_dependencies;
pub mod traits;
pub mod youtube;

pub use deps::ServerDeps;
pub use openai::OpenAiTitleImprover;
pub use resend::ResendNotifier;
pub use test_dependencies::TestDependencies;
pub use traits::*;
pub use youtube::YoutubeAdapter;
