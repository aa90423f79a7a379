//! Server dependencies for effects (using traits for testability)
//!
//! Every pipeline stage reaches the outside world through this container, so
//! tests can swap any adapter or the job store for a fake.

use std::sync::Arc;

use super::openai::OpenAiTitleImprover;
use super::resend::ResendNotifier;
use super::youtube::YoutubeAdapter;
use super::{BaseContentLister, BaseIdentityResolver, BaseNotifier, BaseTextImprover};
use crate::config::Config;
use crate::domains::jobs::JobStore;

/// Server dependencies accessible to effects
#[derive(Clone)]
pub struct ServerDeps {
    pub jobs: Arc<dyn JobStore>,
    pub identity_resolver: Arc<dyn BaseIdentityResolver>,
    pub content_lister: Arc<dyn BaseContentLister>,
    pub text_improver: Arc<dyn BaseTextImprover>,
    pub notifier: Arc<dyn BaseNotifier>,
    /// How many recent items the list stage asks for.
    pub max_items: usize,
}

impl ServerDeps {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        identity_resolver: Arc<dyn BaseIdentityResolver>,
        content_lister: Arc<dyn BaseContentLister>,
        text_improver: Arc<dyn BaseTextImprover>,
        notifier: Arc<dyn BaseNotifier>,
        max_items: usize,
    ) -> Self {
        Self {
            jobs,
            identity_resolver,
            content_lister,
            text_improver,
            notifier,
            max_items,
        }
    }

    /// Production wiring: real adapters built from `config`.
    pub fn from_config(config: &Config, jobs: Arc<dyn JobStore>) -> Self {
        let youtube = Arc::new(YoutubeAdapter::new(&config.youtube));

        Self::new(
            jobs,
            youtube.clone(),
            youtube,
            Arc::new(OpenAiTitleImprover::new(&config.openai)),
            Arc::new(ResendNotifier::new(&config.resend)),
            config.max_items,
        )
    }
}
