// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - each wraps one external request/response
// exchange. Deciding what a result *means* for a job is the pipeline's business.
//
// Naming convention: Base* for trait names (e.g., BaseIdentityResolver, BaseNotifier)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::AdapterError;

// =============================================================================
// Identity Resolver (name or handle -> canonical channel)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIdentity {
    pub id: String,
    pub display_name: String,
}

#[async_trait]
pub trait BaseIdentityResolver: Send + Sync {
    /// Look up the channel a free-form query refers to. `Ok(None)` means no match.
    async fn resolve(&self, query: &str) -> Result<Option<ResolvedIdentity>, AdapterError>;
}

// =============================================================================
// Content Lister (channel -> recent uploads)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

#[async_trait]
pub trait BaseContentLister: Send + Sync {
    /// Most recent items first. An empty list is a valid answer.
    async fn list(&self, id: &str, max_count: usize) -> Result<Vec<ContentItem>, AdapterError>;
}

// =============================================================================
// Text Improver (titles -> improved titles)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSuggestion {
    pub original: String,
    pub improved: String,
    pub rationale: String,
}

#[async_trait]
pub trait BaseTextImprover: Send + Sync {
    /// One suggestion per input title, in input order.
    async fn improve(
        &self,
        display_name: &str,
        titles: &[String],
    ) -> Result<Vec<TitleSuggestion>, AdapterError>;
}

// =============================================================================
// Notifier (email delivery)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub delivery_receipt_id: String,
}

#[async_trait]
pub trait BaseNotifier: Send + Sync {
    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, AdapterError>;
}
