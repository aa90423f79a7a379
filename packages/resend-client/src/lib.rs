//! Pure Resend transactional email client.
//!
//! # Example
//!
//! ```rust,ignore
//! use resend_client::{ResendClient, ResendOptions, SendEmail};
//!
//! let client = ResendClient::new(ResendOptions {
//!     api_key: "re_...".into(),
//!     from: "onboarding@resend.dev".into(),
//! });
//!
//! let sent = client
//!     .send(SendEmail::text("someone@example.com", "Hello", "Plain body"))
//!     .await?;
//! println!("queued as {}", sent.id);
//! ```

pub mod error;

pub use error::{ResendError, Result};

use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Clone)]
pub struct ResendOptions {
    pub api_key: String,
    /// Sender address, e.g. `Title Doctor <reports@example.com>`.
    pub from: String,
}

/// A message to send. Exactly one of `text` / `html` is normally set.
#[derive(Debug, Clone, PartialEq)]
pub struct SendEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl SendEmail {
    pub fn text(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            text: Some(body.into()),
            html: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
}

/// Response of a successful send.
#[derive(Debug, Clone, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    client: reqwest::Client,
    options: ResendOptions,
    base_url: String,
}

impl ResendClient {
    pub fn new(options: ResendOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            options,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn from_address(&self) -> &str {
        &self.options.from
    }

    pub async fn send(&self, email: SendEmail) -> Result<SentEmail> {
        if email.to.is_empty() || email.to.iter().any(|to| !to.contains('@')) {
            return Err(ResendError::InvalidEmail(email.to.join(", ")));
        }

        let payload = EmailPayload {
            from: &self.options.from,
            to: &email.to,
            subject: &email.subject,
            text: email.text.as_deref(),
            html: email.html.as_deref(),
        };

        let resp = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.options.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), %message, "Resend rejected email");
            return Err(ResendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SentEmail = resp.json().await?;
        tracing::debug!(email_id = %sent.id, "Email accepted by Resend");
        Ok(sent)
    }
}
