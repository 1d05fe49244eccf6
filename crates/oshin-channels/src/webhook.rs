//! Incoming-webhook sink. The credential is the webhook URL; the
//! destination is passed along as `channel` for webhooks that honour it.

use async_trait::async_trait;
use oshin_core::error::{OshinError, Result};
use oshin_core::routing::Credential;
use oshin_core::traits::NotificationSink;
use oshin_core::types::OutgoingMessage;
use serde_json::json;

pub struct WebhookSink {
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookSink {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_webhook_body(destination: &str, message: &OutgoingMessage) -> serde_json::Value {
    let mut body = json!({
        "channel": destination,
        "text": message.text,
    });
    if let Some(icon) = &message.presentation.icon_url {
        body["icon_url"] = json!(icon);
    }
    if let Some(name) = &message.presentation.display_name {
        body["username"] = json!(name);
    }
    body
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(
        &self,
        credential: &Credential,
        destination: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let response = self
            .client
            .post(credential.expose())
            .json(&build_webhook_body(destination, message))
            .send()
            .await
            .map_err(|e| OshinError::delivery(format!("Webhook send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(OshinError::delivery(format!(
                "Webhook {status} for {destination}: {text}"
            )));
        }
        Ok(())
    }
}
