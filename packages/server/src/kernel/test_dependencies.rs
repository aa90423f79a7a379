// TestDependencies - mock implementations for testing
//
// Provides mock adapters and an in-memory job store that can be turned into
// ServerDeps for pipeline tests. Every mock records the calls it receives.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{
    BaseContentLister, BaseIdentityResolver, BaseNotifier, BaseTextImprover, ContentItem,
    DeliveryReceipt, ResolvedIdentity, ServerDeps, TitleSuggestion,
};
use crate::common::AdapterError;
use crate::config::DEFAULT_MAX_ITEMS;
use crate::domains::jobs::InMemoryJobStore;

// =============================================================================
// Mock Identity Resolver
// =============================================================================

pub struct MockIdentityResolver {
    identity: Option<ResolvedIdentity>,
    error: Option<AdapterError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockIdentityResolver {
    /// Resolves every query to `C123` / "Acme Channel".
    pub fn new() -> Self {
        Self {
            identity: Some(ResolvedIdentity {
                id: "C123".to_string(),
                display_name: "Acme Channel".to_string(),
            }),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_identity(mut self, id: &str, display_name: &str) -> Self {
        self.identity = Some(ResolvedIdentity {
            id: id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    /// No channel matches any query.
    pub fn not_found(mut self) -> Self {
        self.identity = None;
        self
    }

    pub fn with_error(mut self, error: AdapterError) -> Self {
        self.error = Some(error);
        self
    }

    /// Queries received, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockIdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseIdentityResolver for MockIdentityResolver {
    async fn resolve(&self, query: &str) -> Result<Option<ResolvedIdentity>, AdapterError> {
        self.calls.lock().unwrap().push(query.to_string());
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.identity.clone()),
        }
    }
}

// =============================================================================
// Mock Content Lister
// =============================================================================

pub struct MockContentLister {
    items: Vec<ContentItem>,
    error: Option<AdapterError>,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockContentLister {
    /// Lists five videos.
    pub fn new() -> Self {
        Self::with_item_count(5)
    }

    /// Lists `n` videos titled "Video 1".."Video n".
    pub fn with_item_count(n: usize) -> Self {
        Self {
            items: (1..=n).map(sample_item).collect(),
            error: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_items(mut self, items: Vec<ContentItem>) -> Self {
        self.items = items;
        self
    }

    pub fn empty() -> Self {
        Self::with_item_count(0)
    }

    pub fn with_error(mut self, error: AdapterError) -> Self {
        self.error = Some(error);
        self
    }

    /// `(channel_id, max_count)` pairs received, in order
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockContentLister {
    fn default() -> Self {
        Self::new()
    }
}

/// Video `n` of a fake channel.
pub fn sample_item(n: usize) -> ContentItem {
    ContentItem {
        item_id: format!("vid{n}"),
        title: format!("Video {n}"),
        url: format!("https://www.youtube.com/watch?v=vid{n}"),
        published_at: None,
        thumbnail_url: Some(format!("https://i.ytimg.com/vi/vid{n}/default.jpg")),
    }
}

#[async_trait]
impl BaseContentLister for MockContentLister {
    async fn list(&self, id: &str, max_count: usize) -> Result<Vec<ContentItem>, AdapterError> {
        self.calls.lock().unwrap().push((id.to_string(), max_count));
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.items.iter().take(max_count).cloned().collect()),
        }
    }
}

// =============================================================================
// Mock Text Improver
// =============================================================================

/// Arguments captured from an improve call
#[derive(Debug, Clone)]
pub struct ImproveCall {
    pub display_name: String,
    pub titles: Vec<String>,
}

pub struct MockTextImprover {
    error: Option<AdapterError>,
    drop_last: bool,
    calls: Arc<Mutex<Vec<ImproveCall>>>,
}

impl MockTextImprover {
    /// Answers "Improved: <original>" for every title.
    pub fn new() -> Self {
        Self {
            error: None,
            drop_last: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(mut self, error: AdapterError) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns one suggestion fewer than it was asked for.
    pub fn short_by_one(mut self) -> Self {
        self.drop_last = true;
        self
    }

    pub fn calls(&self) -> Vec<ImproveCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockTextImprover {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTextImprover for MockTextImprover {
    async fn improve(
        &self,
        display_name: &str,
        titles: &[String],
    ) -> Result<Vec<TitleSuggestion>, AdapterError> {
        self.calls.lock().unwrap().push(ImproveCall {
            display_name: display_name.to_string(),
            titles: titles.to_vec(),
        });
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut suggestions: Vec<TitleSuggestion> = titles
            .iter()
            .map(|t| TitleSuggestion {
                original: t.clone(),
                improved: format!("Improved: {t}"),
                rationale: format!("Sharper hook for \"{t}\""),
            })
            .collect();
        if self.drop_last {
            suggestions.pop();
        }
        Ok(suggestions)
    }
}

// =============================================================================
// Mock Notifier
// =============================================================================

/// A message the mock notifier was asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub address: String,
    pub subject: String,
    pub body: String,
}

pub struct MockNotifier {
    error: Option<AdapterError>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            error: None,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(mut self, error: AdapterError) -> Self {
        self.error = Some(error);
        self
    }

    /// Every send attempt, including failed ones
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.address == address)
            .cloned()
            .collect()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseNotifier for MockNotifier {
    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, AdapterError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            address: address.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(DeliveryReceipt {
                delivery_receipt_id: format!("receipt-{}", sent.len()),
            }),
        }
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub jobs: Arc<InMemoryJobStore>,
    pub identity_resolver: Arc<MockIdentityResolver>,
    pub content_lister: Arc<MockContentLister>,
    pub text_improver: Arc<MockTextImprover>,
    pub notifier: Arc<MockNotifier>,
    pub max_items: usize,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(InMemoryJobStore::new()),
            identity_resolver: Arc::new(MockIdentityResolver::new()),
            content_lister: Arc::new(MockContentLister::new()),
            text_improver: Arc::new(MockTextImprover::new()),
            notifier: Arc::new(MockNotifier::new()),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn mock_resolver(mut self, resolver: MockIdentityResolver) -> Self {
        self.identity_resolver = Arc::new(resolver);
        self
    }

    pub fn mock_lister(mut self, lister: MockContentLister) -> Self {
        self.content_lister = Arc::new(lister);
        self
    }

    pub fn mock_improver(mut self, improver: MockTextImprover) -> Self {
        self.text_improver = Arc::new(improver);
        self
    }

    pub fn mock_notifier(mut self, notifier: MockNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Convert into ServerDeps; the mocks stay shared with `self`.
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.jobs.clone(),
            self.identity_resolver.clone(),
            self.content_lister.clone(),
            self.text_improver.clone(),
            self.notifier.clone(),
            self.max_items,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
