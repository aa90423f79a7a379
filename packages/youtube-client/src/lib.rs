//! Pure YouTube Data API v3 client.
//!
//! A minimal client for the two lookups a channel report needs: finding a
//! channel by name or `@handle`, and listing its most recent uploads.
//!
//! # Example
//!
//! ```rust,ignore
//! use youtube_client::YoutubeClient;
//!
//! let client = YoutubeClient::new("your-api-key".into());
//!
//! if let Some(channel) = client.find_channel("@veritasium").await? {
//!     for video in client.recent_videos(&channel.id, 5).await? {
//!         println!("{} {}", video.title, video.url);
//!     }
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{Result, YoutubeError};
pub use types::{Channel, SearchResponse, SearchResult, Video};

use types::ErrorResponse;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Upper bound the search endpoint accepts for `maxResults`.
pub const MAX_RESULTS_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct YoutubeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (proxies, local fakes).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Raw `search.list` call with the given filters.
    pub async fn search(&self, params: &[(&str, &str)]) -> Result<SearchResponse> {
        let url = format!("{}/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("part", "snippet"), ("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Find the best-matching channel for a name or `@handle`.
    ///
    /// Returns `None` when the search has no hits.
    pub async fn find_channel(&self, query: &str) -> Result<Option<Channel>> {
        let query = normalize_query(query);
        tracing::debug!(query, "Searching for channel");

        let response = self
            .search(&[("type", "channel"), ("q", query), ("maxResults", "1")])
            .await?;

        Ok(response.items.into_iter().next().map(|hit| Channel {
            id: hit
                .id
                .channel_id
                .unwrap_or_else(|| hit.snippet.channel_id.clone()),
            title: hit.snippet.title,
        }))
    }

    /// Most recent uploads of a channel, newest first.
    pub async fn recent_videos(&self, channel_id: &str, max_results: u32) -> Result<Vec<Video>> {
        let max_results = max_results.min(MAX_RESULTS_LIMIT).to_string();
        let response = self
            .search(&[
                ("channelId", channel_id),
                ("order", "date"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
            ])
            .await?;

        let videos: Vec<Video> = response
            .items
            .into_iter()
            .filter_map(Video::from_search_result)
            .collect();
        tracing::debug!(channel_id, count = videos.len(), "Fetched recent videos");

        Ok(videos)
    }
}

/// Strip whitespace and a leading `@` from a handle.
pub fn normalize_query(query: &str) -> &str {
    let trimmed = query.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
