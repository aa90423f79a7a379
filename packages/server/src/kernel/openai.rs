//! Title improver backed by OpenAI chat completions in JSON mode.

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};
use serde::Deserialize;
use tracing::debug;

use super::{BaseTextImprover, TitleSuggestion};
use crate::common::AdapterError;
use crate::config::OpenAiSettings;

const SERVICE: &str = "OpenAI";
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str =
    "You are a YouTube SEO and engagement expert who helps creators write better video titles.";

#[derive(Debug, Deserialize)]
struct TitlesResponse {
    #[serde(default)]
    titles: Vec<TitleSuggestion>,
}

pub struct OpenAiTitleImprover {
    client: Option<OpenAIClient>,
    model: String,
}

impl OpenAiTitleImprover {
    pub fn new(settings: &OpenAiSettings) -> Self {
        Self {
            client: settings.api_key.clone().map(OpenAIClient::new),
            model: settings.model.clone(),
        }
    }

    pub fn from_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client: Some(client),
            model: model.into(),
        }
    }
}

/// User prompt listing the numbered titles and the expected JSON shape.
pub fn build_prompt(display_name: &str, titles: &[String]) -> String {
    let numbered = titles
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a YouTube title optimization expert. Below are {count} video titles from the channel "{display_name}".

For each title, provide:
1. An improved version that is more engaging, SEO-friendly, and likely to get more clicks
2. A brief rationale (1-2 sentences) explaining why the improved title is better

Guidelines:
- Keep the core topic and authenticity
- Use action verbs, numbers, and specific value propositions
- Make it curiosity-inducing without being clickbait
- Optimize for searchability and clarity

Video Titles:
{numbered}

Respond in JSON format, with exactly one entry per title and in the same order:
{{
  "titles": [
    {{
      "original": "...",
      "improved": "...",
      "rationale": "..."
    }}
  ]
}}"#,
        count = titles.len(),
    )
}

fn adapter_error(err: OpenAIError) -> AdapterError {
    match err {
        OpenAIError::Config(message) => AdapterError::Configuration(message),
        OpenAIError::Network(message) => AdapterError::transport(SERVICE, message),
        OpenAIError::Api { status, message } => {
            AdapterError::transport(SERVICE, format!("HTTP {status}: {message}"))
        }
        OpenAIError::EmptyResponse(message) | OpenAIError::Parse(message) => {
            AdapterError::invalid_response(SERVICE, message)
        }
    }
}

/// Suggestions must line up one-to-one with the titles that were sent.
fn check_alignment(
    titles: &[String],
    suggestions: Vec<TitleSuggestion>,
) -> Result<Vec<TitleSuggestion>, AdapterError> {
    if suggestions.len() != titles.len() {
        return Err(AdapterError::invalid_response(
            SERVICE,
            format!(
                "expected {} suggestions, got {}",
                titles.len(),
                suggestions.len()
            ),
        ));
    }
    Ok(suggestions)
}

#[async_trait]
impl BaseTextImprover for OpenAiTitleImprover {
    async fn improve(
        &self,
        display_name: &str,
        titles: &[String],
    ) -> Result<Vec<TitleSuggestion>, AdapterError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AdapterError::Configuration("OpenAI API key is not configured".into()))?;

        let request = ChatRequest::new(&self.model)
            .message(Message::system(SYSTEM_PROMPT))
            .message(Message::user(build_prompt(display_name, titles)))
            .temperature(TEMPERATURE);

        let response: TitlesResponse = client.chat_json(request).await.map_err(adapter_error)?;
        debug!(
            model = %self.model,
            requested = titles.len(),
            returned = response.titles.len(),
            "Title suggestions received"
        );

        check_alignment(titles, response.titles)
    }
}
