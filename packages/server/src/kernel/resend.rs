use async_trait::async_trait;
use resend_client::{ResendClient, ResendError, ResendOptions, SendEmail};

use super::{BaseNotifier, DeliveryReceipt};
use crate::common::AdapterError;
use crate::config::ResendSettings;

const SERVICE: &str = "Resend";

/// Email notifier over the Resend API.
pub struct ResendNotifier {
    client: Option<ResendClient>,
}

impl ResendNotifier {
    pub fn new(settings: &ResendSettings) -> Self {
        Self {
            client: settings.api_key.clone().map(|api_key| {
                ResendClient::new(ResendOptions {
                    api_key,
                    from: settings.from_email.clone(),
                })
            }),
        }
    }

    pub fn from_client(client: ResendClient) -> Self {
        Self {
            client: Some(client),
        }
    }
}

fn adapter_error(err: ResendError) -> AdapterError {
    match err {
        ResendError::Api { status, message } => {
            AdapterError::transport(SERVICE, format!("HTTP {status}: {message}"))
        }
        ResendError::Network(e) => AdapterError::transport(SERVICE, e.to_string()),
        ResendError::InvalidEmail(address) => {
            AdapterError::invalid_response(SERVICE, format!("rejected recipient {address}"))
        }
    }
}

#[async_trait]
impl BaseNotifier for ResendNotifier {
    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, AdapterError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AdapterError::Configuration("Resend API key is not configured".into()))?;

        let sent = client
            .send(SendEmail::text(address, subject, body))
            .await
            .map_err(adapter_error)?;

        Ok(DeliveryReceipt {
            delivery_receipt_id: sent.id,
        })
    }
}
