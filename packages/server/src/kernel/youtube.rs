//! YouTube-backed identity resolver and content lister.

use async_trait::async_trait;
use tracing::debug;
use youtube_client::{YoutubeClient, YoutubeError};

use super::{BaseContentLister, BaseIdentityResolver, ContentItem, ResolvedIdentity};
use crate::common::AdapterError;
use crate::config::YoutubeSettings;

const SERVICE: &str = "YouTube";

/// Wrapper around `YoutubeClient` implementing both lookup traits.
///
/// Built even without an API key; calls then fail with a configuration error.
pub struct YoutubeAdapter {
    client: Option<YoutubeClient>,
}

impl YoutubeAdapter {
    pub fn new(settings: &YoutubeSettings) -> Self {
        Self {
            client: settings.api_key.clone().map(YoutubeClient::new),
        }
    }

    pub fn from_client(client: YoutubeClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&YoutubeClient, AdapterError> {
        self.client
            .as_ref()
            .ok_or_else(|| AdapterError::Configuration("YouTube API key is not configured".into()))
    }
}

fn adapter_error(err: YoutubeError) -> AdapterError {
    match err {
        YoutubeError::Api { status, message } => {
            AdapterError::transport(SERVICE, format!("HTTP {status}: {message}"))
        }
        YoutubeError::Network(e) => AdapterError::transport(SERVICE, e.to_string()),
        YoutubeError::Parse(e) => AdapterError::invalid_response(SERVICE, e.to_string()),
    }
}

#[async_trait]
impl BaseIdentityResolver for YoutubeAdapter {
    async fn resolve(&self, query: &str) -> Result<Option<ResolvedIdentity>, AdapterError> {
        let channel = self
            .client()?
            .find_channel(query)
            .await
            .map_err(adapter_error)?;

        debug!(query, found = channel.is_some(), "Channel lookup finished");
        Ok(channel.map(|c| ResolvedIdentity {
            id: c.id,
            display_name: c.title,
        }))
    }
}

#[async_trait]
impl BaseContentLister for YoutubeAdapter {
    async fn list(&self, id: &str, max_count: usize) -> Result<Vec<ContentItem>, AdapterError> {
        let max = u32::try_from(max_count).unwrap_or(u32::MAX);
        let videos = self
            .client()?
            .recent_videos(id, max)
            .await
            .map_err(adapter_error)?;

        Ok(videos
            .into_iter()
            .map(|v| ContentItem {
                item_id: v.id,
                title: v.title,
                url: v.url,
                published_at: v.published_at,
                thumbnail_url: v.thumbnail_url,
            })
            .collect())
    }
}
